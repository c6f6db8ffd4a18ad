//! Scalar type and pattern checks
//!
//! Values are checked in their textual form, the way they appear in YAML or
//! were typed by a user.

use crate::models::{IssueCategory, ValidationResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value as JsonValue;

const TRUTHY: &[&str] = &["true", "yes", "on", "1"];
const FALSY: &[&str] = &["false", "no", "off", "0"];

/// Scalar types recognized by [`validate_type`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Integer,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339, or `YYYY-MM-DDTHH:MM:SS` without offset
    DateTime,
    /// Any text, including the null sentinels
    StringOrNull,
    /// Non-empty text that is not a null sentinel
    String,
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Integer => "integer",
            TypeKind::Boolean => "boolean",
            TypeKind::Date => "date",
            TypeKind::DateTime => "date-time",
            TypeKind::StringOrNull => "string-or-null",
            TypeKind::String => "string",
        }
    }
}

/// Empty, `null` or `~`
pub fn is_null_sentinel(value: &str) -> bool {
    matches!(value.trim(), "" | "null" | "~")
}

/// Parse a boolean literal (case-insensitive)
pub fn parse_bool(value: &str) -> Option<bool> {
    let lower = value.trim().to_ascii_lowercase();
    if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && value.parse::<i64>().is_ok()
}

fn is_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
}

/// Check that `value` has type `kind`
pub fn validate_type(field: &str, value: &str, kind: TypeKind) -> ValidationResult {
    let mut result = ValidationResult::new();

    let ok = match kind {
        TypeKind::Integer => is_integer(value),
        TypeKind::Boolean => parse_bool(value).is_some(),
        TypeKind::Date => is_date(value),
        TypeKind::DateTime => is_date_time(value),
        TypeKind::StringOrNull => true,
        TypeKind::String => !is_null_sentinel(value),
    };

    if !ok {
        result.error(
            format!("'{}' is not a valid {}", value, kind.name()),
            Some(field),
            IssueCategory::TypeMismatch,
        );
    }
    result
}

/// Check that `value` matches `pattern`; empty and null values pass
pub fn validate_pattern(field: &str, value: &str, pattern: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    if is_null_sentinel(value) {
        return result;
    }

    match Regex::new(pattern) {
        Ok(re) if re.is_match(value) => {}
        Ok(_) => result.error(
            format!("'{}' does not match pattern {}", value, pattern),
            Some(field),
            IssueCategory::PatternMismatch,
        ),
        Err(e) => result.error(
            format!("invalid pattern {}: {}", pattern, e),
            Some(field),
            IssueCategory::InvalidStructure,
        ),
    }
    result
}

/// Textual form of a JSON scalar (`None` for arrays and objects)
pub fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => Some("null".to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() {
        assert!(validate_type("n", "42", TypeKind::Integer).is_valid());
        assert!(validate_type("n", "-7", TypeKind::Integer).is_valid());
        assert!(!validate_type("n", "4.2", TypeKind::Integer).is_valid());
        assert!(!validate_type("n", "+3", TypeKind::Integer).is_valid());
        assert!(!validate_type("n", "-", TypeKind::Integer).is_valid());
        assert!(!validate_type("n", "", TypeKind::Integer).is_valid());
    }

    #[test]
    fn test_boolean_literals() {
        for v in ["true", "YES", "on", "1", "False", "no", "OFF", "0"] {
            assert!(validate_type("b", v, TypeKind::Boolean).is_valid(), "{v}");
        }
        assert!(!validate_type("b", "maybe", TypeKind::Boolean).is_valid());
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
    }

    #[test]
    fn test_dates() {
        assert!(validate_type("d", "2026-10-19", TypeKind::Date).is_valid());
        assert!(!validate_type("d", "2026-13-01", TypeKind::Date).is_valid());
        assert!(!validate_type("d", "2026-1-1", TypeKind::Date).is_valid());

        assert!(validate_type("t", "2026-10-19T08:30:00Z", TypeKind::DateTime).is_valid());
        assert!(validate_type("t", "2026-10-19T08:30:00+02:00", TypeKind::DateTime).is_valid());
        assert!(validate_type("t", "2026-10-19T08:30:00", TypeKind::DateTime).is_valid());
        assert!(!validate_type("t", "2026-10-19", TypeKind::DateTime).is_valid());
    }

    #[test]
    fn test_string_or_null() {
        assert!(validate_type("s", "null", TypeKind::StringOrNull).is_valid());
        assert!(validate_type("s", "", TypeKind::StringOrNull).is_valid());
        assert!(validate_type("s", "anything", TypeKind::StringOrNull).is_valid());
        assert!(!validate_type("s", "~", TypeKind::String).is_valid());
    }

    #[test]
    fn test_pattern_skips_null_values() {
        let hex = "^[0-9a-f]{7,40}$";
        assert!(validate_pattern("git_ref", "", hex).is_valid());
        assert!(validate_pattern("git_ref", "null", hex).is_valid());
        assert!(validate_pattern("git_ref", "abc1234", hex).is_valid());

        let result = validate_pattern("git_ref", "xyz", hex);
        assert!(!result.is_valid());
        assert_eq!(result.issues[0].field.as_deref(), Some("git_ref"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let result = validate_pattern("f", "value", "([unclosed");
        assert_eq!(result.issues[0].category, IssueCategory::InvalidStructure);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&serde_json::json!(null)).as_deref(), Some("null"));
        assert_eq!(scalar_text(&serde_json::json!(3)).as_deref(), Some("3"));
        assert_eq!(scalar_text(&serde_json::json!([1])), None);
    }
}
