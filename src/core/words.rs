// src/core/words.rs

use thiserror::Error;

/// Errors produced while splitting a line into words.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordError {
    /// The line ended inside a double-quoted section.
    #[error("unterminated quote")]
    UnterminatedQuote,
    /// The line ended right after a backslash inside quotes.
    #[error("unterminated escape")]
    UnterminatedEscape,
    /// Inside quotes only `\"` and `\\` are valid escapes.
    #[error("invalid escape '\\{0}' inside quotes")]
    InvalidEscape(char),
}

/// Splits a line's content into words.
///
/// Whitespace separates words outside quotes. A `"` toggles quoting and may appear
/// mid-word (`a"b c"` is the single word `ab c`). Inside quotes, `\"` and `\\` are
/// the only escapes; outside quotes a backslash is an ordinary character.
/// A closing quote always yields a word, so `""` produces an empty word.
pub fn split(content: &str) -> Result<Vec<String>, WordError> {
    let mut words = Vec::new();
    let mut current = String::new();
    // Set once a quote closes, so an empty quoted word is still emitted.
    let mut keep_empty = false;
    let mut quoted = false;
    let mut chars = content.chars();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' => {
                    quoted = false;
                    keep_empty = true;
                }
                '\\' => match chars.next() {
                    Some(escaped @ ('"' | '\\')) => current.push(escaped),
                    Some(other) => return Err(WordError::InvalidEscape(other)),
                    None => return Err(WordError::UnterminatedEscape),
                },
                _ => current.push(c),
            }
            continue;
        }

        match c {
            ' ' | '\t' | '\r' => {
                if !current.is_empty() || keep_empty {
                    words.push(std::mem::take(&mut current));
                    keep_empty = false;
                }
            }
            '"' => quoted = true,
            _ => current.push(c),
        }
    }

    if quoted {
        return Err(WordError::UnterminatedQuote);
    }
    if !current.is_empty() || keep_empty {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words_split_on_whitespace() {
        assert_eq!(split("a b\tc\r d").unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_quoted_words_group_spaces() {
        assert_eq!(split(r#"a "b c" d"#).unwrap(), vec!["a", "b c", "d"]);
    }

    #[test]
    fn test_quotes_concatenate_within_a_word() {
        assert_eq!(split(r#"x"y z"w"#).unwrap(), vec!["xy zw"]);
    }

    #[test]
    fn test_empty_quotes_produce_empty_word() {
        assert_eq!(split(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
        assert_eq!(split(r#""""#).unwrap(), vec![""]);
    }

    #[test]
    fn test_escapes_inside_quotes() {
        assert_eq!(
            split(r#""say \"hi\"" "back\\slash""#).unwrap(),
            vec![r#"say "hi""#, r"back\slash"]
        );
    }

    #[test]
    fn test_backslash_outside_quotes_is_literal() {
        assert_eq!(split(r"a\b c\\d").unwrap(), vec![r"a\b", r"c\\d"]);
        // The backslash stays, and the quote still opens a quoted section.
        assert_eq!(split(r#"a\"b c""#).unwrap(), vec![r"a\b c"]);
    }

    #[test]
    fn test_unterminated_quote_fails() {
        assert_eq!(split(r#"a "b c"#), Err(WordError::UnterminatedQuote));
        assert_eq!(split(r#"a\"b"#), Err(WordError::UnterminatedQuote));
    }

    #[test]
    fn test_unterminated_escape_fails() {
        assert_eq!(split(r#""abc\"#), Err(WordError::UnterminatedEscape));
    }

    #[test]
    fn test_invalid_escape_inside_quotes_fails() {
        assert_eq!(split(r#""a\nb""#), Err(WordError::InvalidEscape('n')));
    }

    #[test]
    fn test_blank_content_has_no_words() {
        assert!(split("   ").unwrap().is_empty());
    }
}
