/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Strip a surrounding markdown code fence (with any language tag) from a
/// model response. Text without a leading fence is returned trimmed.
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, `text`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_multibyte_characters() {
        let text = "Héllo 世界";
        let truncated = truncate_to_char_boundary(text, 9);
        assert!(truncated.len() <= 9);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn truncation_within_bounds_is_identity() {
        assert_eq!(truncate_to_char_boundary("Hello", 100), "Hello");
    }

    #[test]
    fn strips_fences_with_any_language_tag() {
        assert_eq!(strip_code_blocks("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_blocks("```text\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_blocks("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_blocks("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn unterminated_fence_keeps_body() {
        assert_eq!(strip_code_blocks("```json\n[1, 2"), "[1, 2");
    }
}
