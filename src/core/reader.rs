// src/core/reader.rs

use crate::core::indentation;

/// One logical line: continued physical lines merged, indentation measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line.
    pub number: usize,
    /// Indentation width of the first physical line.
    pub width: usize,
    /// Content after the leading whitespace.
    pub text: String,
}

/// A physical line continues when it ends in an odd number of backslashes.
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Splits source text into logical lines.
///
/// Blank lines and full-line comments (first non-blank character `#`) are dropped.
/// A trailing backslash joins the next physical line, appended verbatim.
pub fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (index, physical) in source.lines().enumerate() {
        let number = index + 1;

        let mut line = match pending.take() {
            Some(mut open) => {
                open.text.push_str(physical);
                open
            }
            None => {
                let (width, text) = indentation::measure(physical);
                if text.trim().is_empty() || text.starts_with('#') {
                    continue;
                }
                LogicalLine {
                    number,
                    width,
                    text: text.to_string(),
                }
            }
        };

        if continues(&line.text) {
            line.text.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }

    // A continuation on the last line has nothing left to join.
    if let Some(line) = pending {
        lines.push(line);
    }

    lines
        .into_iter()
        .filter(|line| !line.text.trim().is_empty())
        .map(|mut line| {
            let trimmed_len = line.text.trim_end().len();
            line.text.truncate(trimmed_len);
            line
        })
        .collect()
}
