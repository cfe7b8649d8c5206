//! Defensive parsing of scorer replies.
//!
//! Models are asked for a bare JSON array of integers and usually comply.
//! When they don't (prose around the array, code fences, comments, trailing
//! commas, a reply cut off by the token limit) we try progressively looser
//! readings and only accept a result whose length matches the batch.

use std::sync::LazyLock;

use ai_client::strip_code_blocks;
use regex::Regex;
use serde_json::Value;

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//[^\n]*").unwrap());
static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\]").unwrap());
static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("reply contains no array")]
    NoArray,
    #[error("expected {expected} scores, found {found}")]
    CountMismatch { expected: usize, found: usize },
}

/// Clamp a raw model number into 0–100, rounding fractions.
fn to_score(raw: f64) -> Option<u8> {
    raw.is_finite().then(|| raw.round().clamp(0.0, 100.0) as u8)
}

/// Byte range of the first complete `[...]` in `text`, skipping brackets
/// inside string literals. `None` when the first array never closes.
pub fn first_complete_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escape {
            escape = false;
            continue;
        }
        if b == b'\\' && in_string {
            escape = true;
            continue;
        }
        if b == b'"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove `//` and `/* */` comments and trailing commas before `]`.
fn clean_array(raw: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(raw, "");
    let without_lines = LINE_COMMENT.replace_all(&without_blocks, "");
    TRAILING_COMMA.replace_all(&without_lines, "]").into_owned()
}

/// Strict reading: a JSON array whose every element is a number or a
/// numeric string. `None` if the text is not such an array.
fn structured_scores(array: &str) -> Option<Vec<u8>> {
    let values: Vec<Value> = serde_json::from_str(&clean_array(array)).ok()?;
    values
        .iter()
        .map(|v| match v {
            Value::Number(n) => n.as_f64().and_then(to_score),
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(to_score),
            _ => None,
        })
        .collect()
}

/// Loose reading: every number inside `region`, after comments are removed.
fn bare_scores(region: &str) -> Vec<u8> {
    BARE_NUMBER
        .find_iter(&clean_array(region))
        .filter_map(|m| m.as_str().parse::<f64>().ok().and_then(to_score))
        .collect()
}

/// Recover exactly `expected` scores from a textual reply.
///
/// The first complete array is read strictly, then loosely. Only a reply
/// whose array never closes is read loosely from its first `[` to the end.
pub fn parse_scores(text: &str, expected: usize) -> Result<Vec<u8>, ParseFailure> {
    let text = strip_code_blocks(text);

    if let Some(array) = first_complete_array(text) {
        let scores = structured_scores(array).unwrap_or_else(|| bare_scores(array));
        return check_count(scores, expected);
    }

    let start = text.find('[').ok_or(ParseFailure::NoArray)?;
    check_count(bare_scores(&text[start..]), expected)
}

/// Validate scores the scorer returned already structured.
pub fn accept_scores(raw: &[i64], expected: usize) -> Result<Vec<u8>, ParseFailure> {
    let scores = raw.iter().map(|&s| s.clamp(0, 100) as u8).collect();
    check_count(scores, expected)
}

fn check_count(scores: Vec<u8>, expected: usize) -> Result<Vec<u8>, ParseFailure> {
    if scores.len() == expected {
        Ok(scores)
    } else {
        Err(ParseFailure::CountMismatch {
            expected,
            found: scores.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_array_parses() {
        assert_eq!(parse_scores("[85, 40, 12]", 3).unwrap(), vec![85, 40, 12]);
    }

    #[test]
    fn prose_and_fences_around_array() {
        let reply = "```json\n[90, 15]\n```";
        assert_eq!(parse_scores(reply, 2).unwrap(), vec![90, 15]);

        let reply = "Here are the scores: [72, 55, 3]. Let me know if you need more.";
        assert_eq!(parse_scores(reply, 3).unwrap(), vec![72, 55, 3]);
    }

    #[test]
    fn first_array_wins_over_last_bracket() {
        let reply = "[60, 61]\nNote: items [1] and [2] were borderline.";
        assert_eq!(parse_scores(reply, 2).unwrap(), vec![60, 61]);
    }

    #[test]
    fn comments_and_trailing_commas_stripped() {
        let reply = "[\n  88, // names the client\n  /* tangential */ 35,\n  10,\n]";
        assert_eq!(parse_scores(reply, 3).unwrap(), vec![88, 35, 10]);
    }

    #[test]
    fn floats_and_numeric_strings_are_coerced() {
        assert_eq!(parse_scores(r#"[70.6, "45", 120, -3]"#, 4).unwrap(), vec![71, 45, 100, 0]);
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        assert_eq!(first_complete_array(r#"["a]b", 3] tail"#), Some(r#"["a]b", 3]"#));
    }

    #[test]
    fn truncated_reply_falls_back_to_bare_numbers() {
        let reply = "[80, 45, 62, 19";
        assert_eq!(parse_scores(reply, 4).unwrap(), vec![80, 45, 62, 19]);
    }

    #[test]
    fn truncated_reply_with_wrong_count_fails() {
        let reply = "[80, 45, 6";
        assert_eq!(
            parse_scores(reply, 5),
            Err(ParseFailure::CountMismatch { expected: 5, found: 3 })
        );
    }

    #[test]
    fn numbers_after_a_closed_array_are_not_scores() {
        assert_eq!(
            parse_scores("[80, 45, null]\nScored 3 items.", 3),
            Err(ParseFailure::CountMismatch { expected: 3, found: 2 })
        );
        assert_eq!(
            parse_scores("[80, 45, \"n/a\", 12]\n4 items scored in 2 passes.", 3),
            Ok(vec![80, 45, 12])
        );
    }

    #[test]
    fn comments_in_truncated_reply_are_ignored() {
        let reply = "[80, // item 2 is tangential\n 45, 62";
        assert_eq!(parse_scores(reply, 3).unwrap(), vec![80, 45, 62]);

        let reply = "[80, /* 3 of 4 */ 45";
        assert_eq!(parse_scores(reply, 2).unwrap(), vec![80, 45]);
    }

    #[test]
    fn structured_array_with_wrong_length_fails() {
        assert_eq!(
            parse_scores("[50, 50]", 3),
            Err(ParseFailure::CountMismatch { expected: 3, found: 2 })
        );
    }

    #[test]
    fn no_array_at_all() {
        assert_eq!(
            parse_scores("I cannot score these articles.", 2),
            Err(ParseFailure::NoArray)
        );
    }

    #[test]
    fn structured_reply_is_clamped_and_counted() {
        assert_eq!(accept_scores(&[101, -5, 50], 3).unwrap(), vec![100, 0, 50]);
        assert!(accept_scores(&[1, 2], 3).is_err());
    }
}
