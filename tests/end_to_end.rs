// tests/end_to_end.rs

use ifhook::{
    core::{
        compiler,
        context::RunContext,
        engine::{Diagnostic, Engine, Outcome},
        environment::Env,
        parser::{self, ParseError},
    },
    models::{Config, SweepOrder},
    state::StateStore,
    system::executor::{HookError, Invoker},
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Records every invocation as `PHASE what detail`.
#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<(String, Env)>,
}

impl Invoker for Recorder {
    fn run_hook_dir(&mut self, dir: &Path, order: SweepOrder, env: &Env) -> Result<(), HookError> {
        let category = dir.file_name().unwrap().to_string_lossy().into_owned();
        let detail = match category.as_str() {
            "iface.d" => env["IFACE_TYPE"].clone(),
            _ => match env.get("PROTO_METHOD") {
                Some(method) => format!("{}/{}", env["PROTO_TYPE"], method),
                None => env["PROTO_TYPE"].clone(),
            },
        };
        let order = match order {
            SweepOrder::Ascending => "asc",
            SweepOrder::Descending => "desc",
        };
        self.calls.push((
            format!("{} {} {} {}", env["PHASE"], category, detail, order),
            env.clone(),
        ));
        Ok(())
    }

    fn run_command(&mut self, command: &str, env: &Env) -> Result<(), HookError> {
        self.calls
            .push((format!("{} cmd {}", env["PHASE"], command), env.clone()));
        Ok(())
    }
}

impl Recorder {
    fn labels(&self) -> Vec<&str> {
        self.calls.iter().map(|(label, _)| label.as_str()).collect()
    }
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn load(path: &Path) -> Result<Config, ParseError> {
    let lines = parser::parse_file(path)?;
    compiler::compile(&lines)
}

fn context(root: &Path) -> RunContext {
    RunContext {
        config_file: root.join("interfaces"),
        state_file: root.join("state"),
        hook_root: root.join("hooks"),
        ..RunContext::default()
    }
}

#[test]
fn bridge_with_static_ipv4_up_and_down() {
    let dir = TempDir::new().unwrap();
    let config_path = write(
        dir.path(),
        "interfaces",
        "\
# main bridge
iface eth0
    type bridge
    proto ipv4 static
        address 10.0.0.1/24
",
    );
    let config = load(&config_path).unwrap();
    let context = context(dir.path());

    let mut state = StateStore::load(&context.state_file).unwrap();
    let mut recorder = Recorder::default();
    let outcome = Engine::new(&config, &context, &mut state, &mut recorder).activate("eth0");
    assert!(matches!(outcome, Outcome::Activated { .. }));
    assert_eq!(
        recorder.labels(),
        vec![
            "pre-up iface.d bridge asc",
            "pre-up proto.d ipv4 asc",
            "up iface.d bridge asc",
            "up proto.d ipv4/static asc",
            "post-up iface.d bridge asc",
            "post-up proto.d ipv4 asc",
        ]
    );
    let (_, up_env) = &recorder.calls[3];
    assert_eq!(up_env["PROTO_ADDRESS"], "10.0.0.1/24");
    assert_eq!(up_env["IFACE"], "eth0");
    assert_eq!(up_env["MODE"], "start");

    state.persist().unwrap();
    assert_eq!(fs::read_to_string(&context.state_file).unwrap(), "eth0=eth0\n");

    // A fresh run sees the persisted state.
    let mut state = StateStore::load(&context.state_file).unwrap();
    let mut recorder = Recorder::default();
    let outcome = Engine::new(&config, &context, &mut state, &mut recorder).activate("eth0");
    assert!(matches!(
        outcome,
        Outcome::Skipped(Diagnostic::AlreadyConfigured { .. })
    ));
    assert!(recorder.calls.is_empty());
    assert!(!state.needs_saving());

    let outcome = Engine::new(&config, &context, &mut state, &mut recorder).deactivate("eth0");
    assert!(matches!(outcome, Outcome::Deactivated { .. }));
    assert_eq!(
        recorder.labels(),
        vec![
            "pre-down iface.d bridge desc",
            "pre-down proto.d ipv4 desc",
            "down iface.d bridge desc",
            "down proto.d ipv4/static desc",
            "post-down iface.d bridge desc",
            "post-down proto.d ipv4 desc",
        ]
    );
    assert!(recorder.calls.iter().all(|(_, env)| env["MODE"] == "stop"));

    state.persist().unwrap();
    assert_eq!(fs::read_to_string(&context.state_file).unwrap(), "");
}

#[test]
fn included_directory_and_defines_feed_the_model() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "interfaces.d/10-lan",
        "iface %LAN%\n    up echo lan %ADDR%\n",
    );
    write(
        dir.path(),
        "interfaces.d/20-wan",
        "ifdef WAN\n    iface wan0\nifndef WAN\n    iface unused0\n",
    );
    let config_path = write(
        dir.path(),
        "interfaces",
        "\
define LAN eth0
define ADDR 192.168.1.1
define WAN
include interfaces.d
group all eth0 wan0
",
    );

    let config = load(&config_path).unwrap();
    let names: Vec<&str> = config.entities.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["all", "eth0", "wan0"]);

    let context = context(dir.path());
    let mut state = StateStore::new(&context.state_file, Default::default());
    let mut recorder = Recorder::default();
    Engine::new(&config, &context, &mut state, &mut recorder).activate("all");

    assert_eq!(recorder.labels(), vec!["up cmd echo lan 192.168.1.1"]);
    let active: Vec<&str> = state.entries().keys().map(String::as_str).collect();
    assert_eq!(active, vec!["all", "eth0", "wan0"]);
}

#[test]
fn self_including_configuration_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "b", "include a\n");
    let config_path = write(dir.path(), "a", "iface eth0\ninclude b\n");

    let err = load(&config_path).unwrap_err();
    assert!(matches!(err, ParseError::RecursiveInclude { .. }));
}

#[test]
fn fatal_errors_carry_the_failing_location() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "extra", "iface eth1\n  bogus keyword\n");
    let config_path = write(dir.path(), "interfaces", "iface eth0\ninclude extra\n");

    let err = load(&config_path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("extra:2"), "unexpected message: {message}");
}

#[test]
fn diagnostics_skip_only_the_failing_target() {
    let dir = TempDir::new().unwrap();
    let config_path = write(
        dir.path(),
        "interfaces",
        "iface eth0\n    up echo eth0\nmapping wlan0\n",
    );
    let config = load(&config_path).unwrap();
    let context = context(dir.path());
    let mut state = StateStore::new(&context.state_file, Default::default());
    let mut recorder = Recorder::default();
    let mut engine = Engine::new(&config, &context, &mut state, &mut recorder);

    let outcomes: Vec<Outcome> = ["missing", "wlan0", "eth0", "eth0"]
        .iter()
        .map(|target| engine.activate(target))
        .collect();
    assert!(matches!(outcomes[0], Outcome::Skipped(Diagnostic::Unknown { .. })));
    assert!(matches!(
        outcomes[1],
        Outcome::Skipped(Diagnostic::MappingUnresolved { .. })
    ));
    assert!(matches!(outcomes[2], Outcome::Activated { .. }));
    assert!(matches!(
        outcomes[3],
        Outcome::Skipped(Diagnostic::AlreadyConfigured { .. })
    ));
    drop(engine);

    assert_eq!(recorder.labels(), vec!["up cmd echo eth0"]);
}
