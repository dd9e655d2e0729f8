//! Utility functions shared across the tasktree crates

use crate::constants::{PROJECT_ID_PREFIX, TASK_ID_PREFIX};
use chrono::Utc;
use uuid::Uuid;

/// Characters that never appear in a generated identifier
const FORBIDDEN_ID_CHARS: &[char] = &['<', '>', '"', '\'', '&', ';', '(', ')', '|', '`'];

/// Generate an identifier of the form `<prefix><millis>_<random>`
///
/// The random part is taken from a v4 UUID and truncated to `random_len`
/// hex characters (at most 32).
#[must_use]
pub fn generate_id(prefix: &str, random_len: usize) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    let random = &random[..random_len.min(random.len())];
    format!("{prefix}{millis}_{random}")
}

/// Generate a project identifier
#[must_use]
pub fn generate_project_id() -> String {
    generate_id(PROJECT_ID_PREFIX, 6)
}

/// Generate a task identifier
#[must_use]
pub fn generate_task_id() -> String {
    generate_id(TASK_ID_PREFIX, 8)
}

/// Check an identifier for basic well-formedness
///
/// Identifiers must be at least three characters long and must not contain
/// markup or shell metacharacters. When `prefix` is given the identifier must
/// start with it.
#[must_use]
pub fn is_valid_id(id: &str, prefix: Option<&str>) -> bool {
    if id.chars().count() < 3 {
        return false;
    }
    if let Some(prefix) = prefix {
        if !id.starts_with(prefix) {
            return false;
        }
    }
    !id.chars().any(|c| FORBIDDEN_ID_CHARS.contains(&c))
}

/// Validate a `#RRGGBB` color string
#[must_use]
pub fn is_valid_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Count characters (not bytes) of a string
#[must_use]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to a maximum number of characters, appending `...`
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if char_len(s) <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_task_id_shape() {
        let id = generate_task_id();
        assert!(id.starts_with('t'));
        let (stamp, random) = id[1..].split_once('_').unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(random.len(), 8);
    }

    #[test]
    fn test_generate_project_id_shape() {
        let id = generate_project_id();
        assert!(id.starts_with('p'));
        assert_eq!(id.split_once('_').unwrap().1.len(), 6);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_task_id();
        let b = generate_task_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_ids_are_valid() {
        assert!(is_valid_id(&generate_task_id(), Some("t")));
        assert!(is_valid_id(&generate_project_id(), Some("p")));
    }

    #[test]
    fn test_is_valid_id_rejects() {
        assert!(!is_valid_id("", None));
        assert!(!is_valid_id("ab", None));
        assert!(!is_valid_id("t1<script>", None));
        assert!(!is_valid_id("p123", Some("t")));
        assert!(!is_valid_id("t1;drop", None));
    }

    #[test]
    fn test_is_valid_hex_color() {
        assert!(is_valid_hex_color("#FF00aa"));
        assert!(is_valid_hex_color("#123456"));
        assert!(!is_valid_hex_color("FF00AA"));
        assert!(!is_valid_hex_color("#FF00A"));
        assert!(!is_valid_hex_color("#GG0000"));
        assert!(!is_valid_hex_color("#FF00AA0"));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello world", 5), "he...");
        assert_eq!(truncate_string("hi", 10), "hi");
        assert_eq!(truncate_string("日本語のタスク名", 6), "日本語...");
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(char_len("abc"), 3);
        assert_eq!(char_len("日本"), 2);
    }
}
