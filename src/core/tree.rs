// src/core/tree.rs

use crate::core::{
    directives::{Preprocessor, RawLine},
    parser::{Location, ParseError},
    words,
};
use std::cell::OnceCell;

/// A finalized configuration line and the deeper lines it owns.
#[derive(Debug, Clone)]
pub struct ConfigLine {
    level: usize,
    content: String,
    words: OnceCell<Vec<String>>,
    location: Location,
    children: Vec<ConfigLine>,
}

impl ConfigLine {
    fn new(raw: RawLine) -> Self {
        Self {
            level: raw.level,
            content: raw.content,
            words: OnceCell::new(),
            location: raw.location,
            children: Vec::new(),
        }
    }

    /// Nesting level, 0 for top-level lines.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The line as written, after substitution and without indentation.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Where the line starts.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Lines one level deeper, in source order.
    pub fn children(&self) -> &[ConfigLine] {
        &self.children
    }

    /// The line split into words. Computed on first use.
    pub fn words(&self) -> Result<&[String], ParseError> {
        if let Some(words) = self.words.get() {
            return Ok(words);
        }
        let split = words::split(&self.content).map_err(|source| ParseError::Words {
            source,
            location: self.location.clone(),
        })?;
        Ok(self.words.get_or_init(|| split))
    }

    /// First word of the line. Quoting is ignored, which is enough for keyword dispatch.
    pub fn keyword(&self) -> &str {
        self.content.split_whitespace().next().unwrap_or_default()
    }

    /// Content following the keyword, verbatim.
    pub fn rest(&self) -> &str {
        let keyword = self.keyword();
        self.content
            .trim_start()
            .strip_prefix(keyword)
            .unwrap_or_default()
            .trim_start()
    }
}

impl PartialEq for ConfigLine {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.content == other.content
            && self.location == other.location
            && self.children == other.children
    }
}

impl Eq for ConfigLine {}

/// Moves every open line deeper than `depth` into its parent (or the roots).
fn close_to(open: &mut Vec<ConfigLine>, roots: &mut Vec<ConfigLine>, depth: usize) {
    while open.len() > depth {
        let Some(line) = open.pop() else { break };
        match open.last_mut() {
            Some(parent) => parent.children.push(line),
            None => roots.push(line),
        }
    }
}

/// Drains the preprocessor into a forest of top-level lines.
///
/// `open` holds the chain of lines that can still receive children; its length
/// is one more than the deepest level currently open.
pub fn build_forest(preprocessor: &mut Preprocessor) -> Result<Vec<ConfigLine>, ParseError> {
    let mut roots = Vec::new();
    let mut open: Vec<ConfigLine> = Vec::new();

    while let Some(raw) = preprocessor.next_line()? {
        if raw.level > open.len() {
            return Err(ParseError::UnexpectedNesting {
                location: raw.location,
            });
        }
        close_to(&mut open, &mut roots, raw.level);
        open.push(ConfigLine::new(raw));
    }
    close_to(&mut open, &mut roots, 0);

    log::debug!("Built configuration forest with {} root line(s)", roots.len());
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use crate::core::parser::{ParseError, parse_source};
    use std::path::Path;

    const SOURCE: &str = "\
iface eth0
    type bridge
        ports eth1 eth2
    proto ipv4 static
        address 10.0.0.1/24
    up echo up
group lan eth0
    post-up echo done
";

    #[test]
    fn test_children_are_exactly_one_level_deeper() {
        let roots = parse_source(Path::new("/v/i"), SOURCE).unwrap();
        assert_eq!(roots.len(), 2);

        let iface = &roots[0];
        assert_eq!(iface.content(), "iface eth0");
        assert_eq!(iface.children().len(), 3);
        for child in iface.children() {
            assert_eq!(child.level(), 1);
        }
        let type_line = &iface.children()[0];
        assert_eq!(type_line.children()[0].content(), "ports eth1 eth2");
        assert_eq!(type_line.children()[0].level(), 2);

        let group = &roots[1];
        assert_eq!(group.words().unwrap(), ["group", "lan", "eth0"]);
        assert_eq!(group.children()[0].location().line, 8);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let first = parse_source(Path::new("/v/i"), SOURCE).unwrap();
        let second = parse_source(Path::new("/v/i"), SOURCE).unwrap();
        // Forcing the lazy words on one side must not affect equality.
        first[1].words().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_keyword_and_rest() {
        let roots = parse_source(Path::new("/v/i"), "up   ip link set \"x y\"\n").unwrap();
        assert_eq!(roots[0].keyword(), "up");
        assert_eq!(roots[0].rest(), "ip link set \"x y\"");
    }

    #[test]
    fn test_words_error_carries_location() {
        let roots = parse_source(Path::new("/v/i"), "iface eth0\n    type \"open\n").unwrap();
        let err = roots[0].children()[0].words().unwrap_err();
        assert!(matches!(err, ParseError::Words { location, .. } if location.line == 2));
    }

    #[test]
    fn test_block_under_directive_is_unexpected_nesting() {
        let err = parse_source(Path::new("/v/i"), "define X\n    iface eth0\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedNesting { location } if location.line == 2));
    }
}
