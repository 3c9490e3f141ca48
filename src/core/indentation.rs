//! Indentation resolution.
//!
//! Every file keeps a stack of the indentation widths seen so far. A wider line
//! opens a new level, a line matching a width on the stack returns to that level,
//! and anything in between is an error.

use crate::constants::TAB_WIDTH;

/// Measures a leading whitespace run. Spaces count one column, tabs advance
/// to the next multiple of [`TAB_WIDTH`]. Returns the width and the rest of the line.
pub fn measure(line: &str) -> (usize, &str) {
    let mut width = 0;
    for (offset, c) in line.char_indices() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
            _ => return (width, line.get(offset..).unwrap_or_default()),
        }
    }
    (width, "")
}

/// Stack of indentation widths for one file.
#[derive(Debug, Default, Clone)]
pub struct IndentStack {
    widths: Vec<usize>,
}

impl IndentStack {
    /// An empty stack; the first line sets level 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nesting level for a line of the given width, or `None`
    /// when the width does not fit the stack.
    pub fn level_for(&mut self, width: usize) -> Option<usize> {
        let Some(&top) = self.widths.last() else {
            self.widths.push(width);
            return Some(0);
        };

        if width > top {
            self.widths.push(width);
            return Some(self.widths.len() - 1);
        }

        let position = self.widths.iter().position(|&w| w == width)?;
        self.widths.truncate(position + 1);
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(widths: &[usize]) -> Vec<Option<usize>> {
        let mut stack = IndentStack::new();
        widths.iter().map(|&w| stack.level_for(w)).collect()
    }

    #[test]
    fn test_measure_spaces_and_tabs() {
        assert_eq!(measure("    iface eth0"), (4, "iface eth0"));
        assert_eq!(measure("\tup"), (8, "up"));
        assert_eq!(measure("  \tup"), (8, "up"));
        assert_eq!(measure("\t  up"), (10, "up"));
        assert_eq!(measure("top"), (0, "top"));
    }

    #[test]
    fn test_deeper_lines_open_levels() {
        assert_eq!(levels(&[0, 4, 8, 12]), vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_matching_width_returns_to_level() {
        assert_eq!(
            levels(&[0, 4, 8, 4, 0, 2]),
            vec![Some(0), Some(1), Some(2), Some(1), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_first_line_defines_base_width() {
        assert_eq!(levels(&[2, 6, 2]), vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_width_between_levels_is_rejected() {
        assert_eq!(levels(&[0, 4, 8, 6]), vec![Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_width_below_base_is_rejected() {
        assert_eq!(levels(&[4, 8, 2]), vec![Some(0), Some(1), None]);
    }
}
