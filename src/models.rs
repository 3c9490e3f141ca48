// src/models.rs

use crate::core::parser::Location;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// --- PHASES AND DIRECTION ---

/// One step of an activation or deactivation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// `pre-up`
    PreUp,
    /// `up`
    Up,
    /// `post-up`
    PostUp,
    /// `pre-down`
    PreDown,
    /// `down`
    Down,
    /// `post-down`
    PostDown,
}

impl Phase {
    /// Interface activation phases, in execution order.
    pub const ACTIVATION: [Self; 3] = [Self::PreUp, Self::Up, Self::PostUp];
    /// Interface deactivation phases, in execution order.
    pub const DEACTIVATION: [Self; 3] = [Self::PreDown, Self::Down, Self::PostDown];

    /// The keyword used for this phase in the configuration and in `PHASE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreUp => "pre-up",
            Self::Up => "up",
            Self::PostUp => "post-up",
            Self::PreDown => "pre-down",
            Self::Down => "down",
            Self::PostDown => "post-down",
        }
    }

    /// Parses a phase keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "pre-up" => Some(Self::PreUp),
            "up" => Some(Self::Up),
            "post-up" => Some(Self::PostUp),
            "pre-down" => Some(Self::PreDown),
            "down" => Some(Self::Down),
            "post-down" => Some(Self::PostDown),
            _ => None,
        }
    }

    /// `up` and `down` sweep every protocol definition with its own options;
    /// the other phases sweep each distinct protocol type once.
    pub fn sweeps_protocol_instances(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Groups only know the phases surrounding their dependencies.
    pub fn allowed_in_group(self) -> bool {
        !self.sweeps_protocol_instances()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an operation, exported to hooks as `MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bringing targets up.
    Start,
    /// Bringing targets down.
    Stop,
}

impl Mode {
    /// The value exported as `MODE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// Hook directories run ascending when starting and descending when stopping.
    pub fn sweep_order(self) -> SweepOrder {
        match self {
            Self::Start => SweepOrder::Ascending,
            Self::Stop => SweepOrder::Descending,
        }
    }
}

/// Order in which the members of a hook directory are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOrder {
    /// By file name, A to Z.
    Ascending,
    /// By file name, Z to A.
    Descending,
}

// --- DEFINITIONS ---

/// Ordered `option -> values` pairs as written under a `type` or `proto` line.
pub type OptionList = Vec<(String, Vec<String>)>;

/// The `type` block of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// The type name, exported as `IFACE_TYPE`.
    pub name: String,
    /// Options from the indented block.
    pub options: OptionList,
    /// `IFACE_TYPE` plus one `IFACE_<OPTION>` key per option.
    pub env: BTreeMap<String, String>,
}

/// One `proto TYPE METHOD` block of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoDef {
    /// Protocol type, such as `ipv4`.
    pub kind: String,
    /// Configuration method, such as `static` or `dhcp`.
    pub method: String,
    /// Options from the indented block.
    pub options: OptionList,
    /// `PROTO_TYPE`, `PROTO_METHOD` plus one `PROTO_<OPTION>` key per option.
    pub env: BTreeMap<String, String>,
}

/// A named leaf network entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Logical name.
    pub name: String,
    /// The optional `type` block.
    pub kind: Option<TypeDef>,
    /// `proto` blocks in file order.
    pub protocols: Vec<ProtoDef>,
    /// Distinct protocol types in first-occurrence order.
    pub protocol_types: Vec<String>,
    /// Inline commands per phase.
    pub commands: BTreeMap<Phase, Vec<String>>,
    /// Where the definition starts.
    pub location: Location,
}

impl Interface {
    /// Inline commands of a phase, in file order.
    pub fn commands(&self, phase: Phase) -> &[String] {
        self.commands.get(&phase).map_or(&[], Vec::as_slice)
    }
}

/// A named composite entity activating its dependencies in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Logical name.
    pub name: String,
    /// Targets activated in this order, deactivated in reverse.
    pub dependencies: Vec<String>,
    /// Inline commands per phase. Only the pre/post phases occur.
    pub commands: BTreeMap<Phase, Vec<String>>,
    /// Where the definition starts.
    pub location: Location,
}

impl Group {
    /// Inline commands of a phase, in file order.
    pub fn commands(&self, phase: Phase) -> &[String] {
        self.commands.get(&phase).map_or(&[], Vec::as_slice)
    }
}

/// A named alias. Resolution rules are recorded but not evaluated yet, so
/// [`Mapping::resolve`] never produces a logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// The instance name this mapping applies to.
    pub name: String,
    /// Indented rule lines, verbatim.
    pub rules: Vec<String>,
    /// Where the definition starts.
    pub location: Location,
}

impl Mapping {
    /// The logical name for `instance`. Always `None` for now.
    pub fn resolve(&self, instance: &str) -> Option<String> {
        log::debug!(
            "Mapping '{}' has {} rule(s); no rule resolved '{}'.",
            self.name,
            self.rules.len(),
            instance
        );
        None
    }
}

/// Anything that can be brought up or down. Interfaces and groups share one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// An `iface` definition.
    Interface(Interface),
    /// A `group` definition.
    Group(Group),
}

impl Entity {
    /// Logical name.
    pub fn name(&self) -> &str {
        match self {
            Self::Interface(iface) => &iface.name,
            Self::Group(group) => &group.name,
        }
    }

    /// `interface` or `group`, for messages.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Interface(_) => "interface",
            Self::Group(_) => "group",
        }
    }

    /// Where the definition starts.
    pub fn location(&self) -> &Location {
        match self {
            Self::Interface(iface) => &iface.location,
            Self::Group(group) => &group.location,
        }
    }
}

/// The complete, read-only model built from one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Interfaces and groups by name.
    pub entities: BTreeMap<String, Entity>,
    /// Mappings by instance name.
    pub mappings: BTreeMap<String, Mapping>,
    /// Allow-lists by name.
    pub allow: BTreeMap<String, BTreeSet<String>>,
}

impl Config {
    /// Looks up an interface or group.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Looks up the mapping for an instance name.
    pub fn mapping(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }

    /// Members of an allow-list, if one with that name was declared.
    pub fn allowed(&self, list: &str) -> Option<&BTreeSet<String>> {
        self.allow.get(list)
    }
}
