//! Agent roster and activation transitions

use super::primitives::is_null_sentinel;
use crate::models::{IssueCategory, ValidationResult};

/// Known agents
pub const AGENT_ROSTER: &[&str] = &[
    "researcher",
    "planner",
    "architect",
    "implementer",
    "tester",
    "reviewer",
    "deployer",
    "documenter",
];

/// Any agent may hand over to this role
pub const TERMINAL_AGENT: &str = "documenter";

/// Allowed `from -> to` pairs besides first activation and the terminal role
pub const ALLOWED_TRANSITIONS: &[(&str, &str)] = &[
    ("researcher", "planner"),
    ("researcher", "architect"),
    ("planner", "architect"),
    ("planner", "implementer"),
    ("architect", "implementer"),
    ("implementer", "tester"),
    ("tester", "implementer"),
    ("tester", "reviewer"),
    ("reviewer", "implementer"),
    ("reviewer", "deployer"),
];

pub fn is_known_agent(name: &str) -> bool {
    AGENT_ROSTER.contains(&name)
}

/// Check that `name` is in the roster
pub fn validate_agent_schema(name: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    if !is_known_agent(name) {
        result.error(
            format!(
                "unknown agent '{}' (expected one of: {})",
                name,
                AGENT_ROSTER.join(", ")
            ),
            Some("active_agent.name"),
            IssueCategory::UnknownAgent,
        );
    }
    result
}

/// Check that control may pass from `from` to `to`
///
/// An unset `from` (empty or null) allows any known `to`.
pub fn validate_agent_transition(from: &str, to: &str) -> ValidationResult {
    let mut result = validate_agent_schema(to);

    if is_null_sentinel(from) {
        return result;
    }

    if !is_known_agent(from) {
        result.error(
            format!("unknown source agent '{}'", from),
            Some("active_agent.name"),
            IssueCategory::UnknownAgent,
        );
        return result;
    }

    if !result.is_valid() || to == TERMINAL_AGENT {
        return result;
    }

    if !ALLOWED_TRANSITIONS.contains(&(from, to)) {
        result.error(
            format!("transition {} -> {} is not allowed", from, to),
            Some("active_agent.name"),
            IssueCategory::InvalidTransition,
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_activation() {
        assert!(validate_agent_transition("", "researcher").is_valid());
        assert!(validate_agent_transition("null", "deployer").is_valid());
        assert!(!validate_agent_transition("", "intern").is_valid());
    }

    #[test]
    fn test_backwards_jump_rejected() {
        let result = validate_agent_transition("deployer", "researcher");
        assert!(!result.is_valid());
        assert_eq!(result.issues[0].category, IssueCategory::InvalidTransition);
    }

    #[test]
    fn test_any_agent_to_terminal() {
        for from in AGENT_ROSTER {
            assert!(
                validate_agent_transition(from, TERMINAL_AGENT).is_valid(),
                "{from} -> documenter"
            );
        }
    }

    #[test]
    fn test_allow_list() {
        for (from, to) in ALLOWED_TRANSITIONS {
            assert!(validate_agent_transition(from, to).is_valid());
        }
        assert!(!validate_agent_transition("planner", "deployer").is_valid());
        assert!(!validate_agent_transition("tester", "tester").is_valid());
    }

    #[test]
    fn test_unknown_agents() {
        assert!(!validate_agent_schema("intern").is_valid());
        assert!(validate_agent_schema("architect").is_valid());
        let result = validate_agent_transition("ghost", "planner");
        assert_eq!(result.issues[0].category, IssueCategory::UnknownAgent);
    }
}
