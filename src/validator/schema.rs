//! Schema Validation for State and Checkpoint Documents
//!
//! Structural rules of STATE.yaml are expressed as a JSON Schema and checked
//! with `jsonschema`, which reports every violation in one pass. Rules that
//! span several fields are checked in code afterwards. Validation never
//! modifies anything.

use super::agent::is_known_agent;
use super::primitives::{is_null_sentinel, scalar_text, validate_pattern, validate_type, TypeKind};
use crate::models::{
    AgentStatus, CheckpointId, IssueCategory, Phase, ProjectType, StateDocument,
    ValidationResult, CHECKPOINT_INIT,
};
use jsonschema::Validator;
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use std::sync::OnceLock;

/// Revision reference: short or full hex hash
pub const GIT_REF_PATTERN: &str = "^[0-9a-fA-F]{7,40}$";

/// Regex for checkpoint ids, built from the phase list
pub fn checkpoint_id_pattern() -> String {
    let phases: Vec<&str> = Phase::ALL.iter().map(|p| p.as_str()).collect();
    format!("^({}|CP_({})_[0-9]+)$", CHECKPOINT_INIT, phases.join("|"))
}

/// JSON Schema of STATE.yaml
pub fn state_schema() -> JsonValue {
    let phases: Vec<&str> = Phase::ALL.iter().map(|p| p.as_str()).collect();
    let project_types: Vec<&str> = ProjectType::ALL.iter().map(|t| t.as_str()).collect();
    let statuses: Vec<&str> = AgentStatus::ALL.iter().map(|s| s.as_str()).collect();

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": [
            "schema_version",
            "current_phase",
            "current_checkpoint",
            "project",
            "last_updated"
        ],
        "properties": {
            "schema_version": { "type": "string" },
            "current_phase": { "type": "string", "enum": phases },
            "current_checkpoint": { "type": "string", "pattern": checkpoint_id_pattern() },
            "project": {
                "type": "object",
                "required": ["name", "type"],
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "type": { "type": "string", "enum": project_types },
                    "version": { "type": "string" }
                }
            },
            "active_agent": {
                "type": "object",
                "properties": {
                    "name": { "type": ["string", "null"] },
                    "status": { "type": "string", "enum": statuses }
                }
            },
            "capabilities": {
                "type": "array",
                "items": { "type": "string" }
            },
            "phase_progress": {
                "type": "object",
                "propertyNames": { "enum": phases },
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "status": {
                            "type": "string",
                            "enum": ["pending", "in_progress", "completed", "skipped"]
                        },
                        "completion": { "type": "integer", "minimum": 0, "maximum": 100 }
                    }
                }
            },
            "health": {
                "type": "object",
                "properties": {
                    "status": { "type": "string", "enum": ["healthy", "degraded", "critical"] },
                    "last_check": { "type": ["string", "null"] }
                }
            },
            "last_updated": { "type": "string" }
        }
    })
}

fn compiled_state_schema() -> Result<&'static Validator, &'static str> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            Validator::new(&state_schema()).map_err(|e| format!("Failed to compile schema: {}", e))
        })
        .as_ref()
        .map_err(|e| e.as_str())
}

/// JSON pointer (`/a/b`) to dotted field path (`a.b`)
fn pointer_to_field(pointer: &str) -> Option<String> {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.replace('/', "."))
    }
}

fn categorize(message: &str) -> IssueCategory {
    if message.contains("required") {
        IssueCategory::MissingField
    } else if message.contains("is not one of") {
        IssueCategory::InvalidValue
    } else if message.contains("does not match") {
        IssueCategory::PatternMismatch
    } else if message.contains("is not of type") {
        IssueCategory::TypeMismatch
    } else {
        IssueCategory::InvalidStructure
    }
}

/// Validate a state document given as a JSON value
pub fn validate_state_schema(doc: &JsonValue) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !doc.is_object() {
        result.error(
            "state document must be a mapping",
            None,
            IssueCategory::InvalidStructure,
        );
        return result;
    }

    match compiled_state_schema() {
        Ok(validator) => {
            for error in validator.iter_errors(doc) {
                let message = error.to_string();
                let field = pointer_to_field(&error.instance_path.to_string());
                result.error(message.clone(), field.as_deref(), categorize(&message));
            }
        }
        Err(e) => result.error(e, None, IssueCategory::InvalidStructure),
    }

    check_cross_field_rules(doc, &mut result);
    result
}

fn check_cross_field_rules(doc: &JsonValue, result: &mut ValidationResult) {
    // An active agent must have a name
    if let Some(agent) = doc.get("active_agent") {
        let status = agent.get("status").and_then(JsonValue::as_str);
        let name = agent.get("name").and_then(JsonValue::as_str);

        if status == Some(AgentStatus::Active.as_str()) && name.map_or(true, is_null_sentinel) {
            result.error(
                "active_agent.status is 'active' but active_agent.name is null",
                Some("active_agent"),
                IssueCategory::CrossField,
            );
        }

        if let Some(name) = name.filter(|n| !is_null_sentinel(n)) {
            if !is_known_agent(name) {
                result.error(
                    format!("unknown agent '{}'", name),
                    Some("active_agent.name"),
                    IssueCategory::UnknownAgent,
                );
            }
        }
    }

    if let Some(updated) = doc.get("last_updated").and_then(JsonValue::as_str) {
        result.merge(validate_type("last_updated", updated, TypeKind::DateTime));
    }

    // Checkpoint taken in another phase: suspicious but legal
    let phase = doc.get("current_phase").and_then(JsonValue::as_str).and_then(Phase::parse);
    let checkpoint = doc
        .get("current_checkpoint")
        .and_then(JsonValue::as_str)
        .and_then(CheckpointId::parse);
    if let (Some(phase), Some(cp_phase)) = (phase, checkpoint.and_then(|c| c.phase())) {
        if cp_phase != phase {
            result.warning(
                format!(
                    "current_checkpoint belongs to phase '{}' but current_phase is '{}'",
                    cp_phase, phase
                ),
                Some("current_checkpoint"),
                IssueCategory::CrossField,
            );
        }
    }
}

/// Validate STATE.yaml text
pub fn validate_state_yaml(content: &str) -> ValidationResult {
    let yaml: serde_yaml::Value = match serde_yaml::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error(
                format!("Invalid YAML: {}", e),
                None,
                IssueCategory::InvalidStructure,
            );
            return result;
        }
    };

    match serde_json::to_value(&yaml) {
        Ok(json) => validate_state_schema(&json),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error(
                format!("Failed to convert YAML to JSON: {}", e),
                None,
                IssueCategory::InvalidStructure,
            );
            result
        }
    }
}

/// Validate the STATE.yaml file at `path`
pub fn validate_state_file(path: &Path) -> ValidationResult {
    match std::fs::read_to_string(path) {
        Ok(content) => validate_state_yaml(&content),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error(
                format!("Failed to read {}: {}", path.display(), e),
                None,
                IssueCategory::InvalidStructure,
            );
            result
        }
    }
}

/// Validate a typed document (cross-field rules the type system cannot hold)
pub fn validate_state_document(doc: &StateDocument) -> ValidationResult {
    match serde_json::to_value(doc) {
        Ok(json) => validate_state_schema(&json),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error(
                format!("Failed to serialize state: {}", e),
                None,
                IssueCategory::InvalidStructure,
            );
            result
        }
    }
}

/// Validate checkpoint metadata (`id`, `created_at`, `phase`, optional `git_ref`)
pub fn validate_checkpoint_schema(metadata: &JsonValue) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(map) = metadata.as_object() else {
        result.error(
            "checkpoint metadata must be a mapping",
            None,
            IssueCategory::InvalidStructure,
        );
        return result;
    };

    for field in ["id", "created_at", "phase"] {
        match map.get(field) {
            None | Some(JsonValue::Null) => result.error(
                format!("Missing required field: {}", field),
                Some(field),
                IssueCategory::MissingField,
            ),
            Some(v) if !v.is_string() => result.error(
                format!("{} must be a string", field),
                Some(field),
                IssueCategory::TypeMismatch,
            ),
            Some(_) => {}
        }
    }

    if let Some(id) = map.get("id").and_then(JsonValue::as_str) {
        result.merge(validate_pattern("id", id, &checkpoint_id_pattern()));
    }
    if let Some(created_at) = map.get("created_at").and_then(JsonValue::as_str) {
        result.merge(validate_type("created_at", created_at, TypeKind::DateTime));
    }
    if let Some(phase) = map.get("phase").and_then(JsonValue::as_str) {
        if Phase::parse(phase).is_none() {
            result.error(
                format!("'{}' is not a known phase", phase),
                Some("phase"),
                IssueCategory::InvalidValue,
            );
        }
    }

    if let Some(git_ref) = map.get("git_ref") {
        match scalar_text(git_ref) {
            Some(text) if git_ref.is_string() || git_ref.is_null() => {
                result.merge(validate_pattern("git_ref", &text, GIT_REF_PATTERN));
            }
            _ => result.error(
                "git_ref must be a string",
                Some("git_ref"),
                IssueCategory::TypeMismatch,
            ),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectInfo, Severity};

    fn valid_state() -> JsonValue {
        json!({
            "schema_version": "1.0",
            "current_phase": "research",
            "current_checkpoint": "CP_research_002",
            "project": { "name": "demo", "type": "cli", "version": "0.1.0" },
            "active_agent": { "name": "researcher", "status": "active" },
            "capabilities": ["git"],
            "phase_progress": { "research": { "status": "in_progress", "completion": 40 } },
            "health": { "status": "healthy", "last_check": null },
            "last_updated": "2026-10-19T08:00:00Z"
        })
    }

    #[test]
    fn test_valid_state_passes() {
        let result = validate_state_schema(&valid_state());
        assert!(result.is_valid(), "{}", result.format_issues());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_out_of_set_phase_rejected() {
        let mut doc = valid_state();
        doc["current_phase"] = json!("shipping");
        let result = validate_state_schema(&doc);
        assert!(!result.is_valid());
        assert!(result
            .errors()
            .iter()
            .any(|e| e.field.as_deref() == Some("current_phase")));
    }

    #[test]
    fn test_active_agent_without_name_is_error() {
        let mut doc = valid_state();
        doc["active_agent"] = json!({ "name": null, "status": "active" });
        let result = validate_state_schema(&doc);
        assert!(!result.is_valid());
        assert!(result
            .errors()
            .iter()
            .any(|e| e.category == IssueCategory::CrossField));
    }

    #[test]
    fn test_idle_agent_without_name_is_fine() {
        let mut doc = valid_state();
        doc["active_agent"] = json!({ "name": null, "status": "idle" });
        assert!(validate_state_schema(&doc).is_valid());
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut doc = valid_state();
        doc["current_phase"] = json!("shipping");
        doc["current_checkpoint"] = json!("checkpoint-2");
        doc["project"]["type"] = json!("spaceship");
        doc["active_agent"] = json!({ "name": null, "status": "active" });
        doc.as_object_mut().unwrap().remove("schema_version");

        let result = validate_state_schema(&doc);
        let fields: Vec<_> = result
            .errors()
            .iter()
            .filter_map(|e| e.field.clone())
            .collect();
        assert!(fields.contains(&"current_phase".to_string()));
        assert!(fields.contains(&"current_checkpoint".to_string()));
        assert!(fields.contains(&"project.type".to_string()));
        assert!(fields.contains(&"active_agent".to_string()));
        assert!(result
            .errors()
            .iter()
            .any(|e| e.category == IssueCategory::MissingField));
    }

    #[test]
    fn test_checkpoint_grammar() {
        for id in ["CP_INIT", "CP_research_1", "CP_deployment_042"] {
            let mut doc = valid_state();
            doc["current_checkpoint"] = json!(id);
            doc["current_phase"] = json!("research");
            let result = validate_state_schema(&doc);
            assert!(result.is_valid(), "{id}: {}", result.format_issues());
        }
        for id in ["CP_research", "CP_shipping_001", "cp_research_001", "CP_INIT_1"] {
            let mut doc = valid_state();
            doc["current_checkpoint"] = json!(id);
            assert!(!validate_state_schema(&doc).is_valid(), "{id}");
        }
    }

    #[test]
    fn test_checkpoint_phase_mismatch_is_warning() {
        let mut doc = valid_state();
        doc["current_phase"] = json!("planning");
        let result = validate_state_schema(&doc);
        assert!(result.is_valid());
        assert_eq!(result.count_by_severity(Severity::Warning), 1);
    }

    #[test]
    fn test_yaml_entry_points() {
        let result = validate_state_yaml("current_phase: [unclosed");
        assert!(!result.is_valid());

        let result = validate_state_yaml("- just\n- a list\n");
        assert_eq!(result.issues[0].category, IssueCategory::InvalidStructure);

        let doc = StateDocument::new(ProjectInfo::new("demo", ProjectType::Library));
        let yaml = doc.to_yaml().unwrap();
        assert!(validate_state_yaml(&yaml).is_valid());
        assert!(validate_state_document(&doc).is_valid());
    }

    #[test]
    fn test_checkpoint_metadata() {
        let ok = json!({
            "id": "CP_testing_003",
            "created_at": "2026-10-19T08:00:00Z",
            "phase": "testing",
            "git_ref": "a1b2c3d"
        });
        assert!(validate_checkpoint_schema(&ok).is_valid());

        let mut null_ref = ok.clone();
        null_ref["git_ref"] = json!(null);
        assert!(validate_checkpoint_schema(&null_ref).is_valid());

        let too_long = "a".repeat(41);
        for bad_ref in ["a1b2c3", "z1b2c3d4", too_long.as_str()] {
            let mut doc = ok.clone();
            doc["git_ref"] = json!(bad_ref);
            assert!(!validate_checkpoint_schema(&doc).is_valid(), "{bad_ref}");
        }
    }

    #[test]
    fn test_typed_checkpoint_metadata_validates() {
        let metadata = crate::models::CheckpointMetadata {
            id: "CP_review_010".to_string(),
            created_at: chrono::Utc::now(),
            phase: Phase::Review,
            git_ref: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
            message: Some("ready".to_string()),
        };
        let value = serde_json::to_value(&metadata).unwrap();
        let result = validate_checkpoint_schema(&value);
        assert!(result.is_valid(), "{}", result.format_issues());
    }

    #[test]
    fn test_checkpoint_metadata_missing_fields() {
        let result = validate_checkpoint_schema(&json!({ "git_ref": 12 }));
        assert_eq!(result.count_by_severity(Severity::Error), 4);
    }
}
