use crate::limits::FORBIDDEN_TAG_CHARS;

/// Number of characters (Unicode scalar values) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate `s` to at most `max_chars` characters. Strings already within the
/// bound are returned unchanged, so applying it twice is the same as once.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

pub fn is_forbidden_tag_char(c: char) -> bool {
    FORBIDDEN_TAG_CHARS.contains(&c)
}

pub fn contains_forbidden_tag_char(s: &str) -> bool {
    s.chars().any(is_forbidden_tag_char)
}

/// Remove every forbidden tag character from `s`.
pub fn strip_forbidden_tag_chars(s: &str) -> String {
    s.chars().filter(|c| !is_forbidden_tag_char(*c)).collect()
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
