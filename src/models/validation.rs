use serde::{Deserialize, Serialize};

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails validation
    Error,
    /// Reported, never fails validation
    Warning,
}

impl Severity {
    /// Get display symbol for severity
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Error => "🔴",
            Severity::Warning => "🟡",
        }
    }

    /// Get display name for severity
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        }
    }
}

/// Category of validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Document could not be read or is not a mapping
    InvalidStructure,
    /// Required field absent
    MissingField,
    /// Value outside its enumeration
    InvalidValue,
    /// Value does not match its pattern
    PatternMismatch,
    /// Value has the wrong type
    TypeMismatch,
    /// Rule spanning several fields
    CrossField,
    /// Agent not in the roster
    UnknownAgent,
    /// Agent transition not allowed
    InvalidTransition,
}

impl IssueCategory {
    /// Get display name for category
    pub fn name(&self) -> &'static str {
        match self {
            IssueCategory::InvalidStructure => "Invalid Structure",
            IssueCategory::MissingField => "Missing Field",
            IssueCategory::InvalidValue => "Invalid Value",
            IssueCategory::PatternMismatch => "Pattern Mismatch",
            IssueCategory::TypeMismatch => "Type Mismatch",
            IssueCategory::CrossField => "Cross-field Rule",
            IssueCategory::UnknownAgent => "Unknown Agent",
            IssueCategory::InvalidTransition => "Invalid Transition",
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// What's wrong
    pub message: String,
    /// Dotted field path, if the issue is tied to one field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub severity: Severity,
    pub category: IssueCategory,
}

impl ValidationIssue {
    pub fn error(
        message: impl Into<String>,
        field: Option<&str>,
        category: IssueCategory,
    ) -> Self {
        Self {
            message: message.into(),
            field: field.map(str::to_string),
            severity: Severity::Error,
            category,
        }
    }

    pub fn warning(
        message: impl Into<String>,
        field: Option<&str>,
        category: IssueCategory,
    ) -> Self {
        Self {
            message: message.into(),
            field: field.map(str::to_string),
            severity: Severity::Warning,
            category,
        }
    }

    /// Format issue for display
    pub fn format(&self) -> String {
        match &self.field {
            Some(field) => format!(
                "{} [{}] {} - {}",
                self.severity.symbol(),
                self.severity.name(),
                field,
                self.message
            ),
            None => format!(
                "{} [{}] {}",
                self.severity.symbol(),
                self.severity.name(),
                self.message
            ),
        }
    }
}

/// Result of one validation call
///
/// Every `validate_*` function returns a fresh value; nothing is shared
/// between calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error(&mut self, message: impl Into<String>, field: Option<&str>, category: IssueCategory) {
        self.push(ValidationIssue::error(message, field, category));
    }

    pub fn warning(&mut self, message: impl Into<String>, field: Option<&str>, category: IssueCategory) {
        self.push(ValidationIssue::warning(message, field, category));
    }

    /// Append all issues from another result
    pub fn merge(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// Validation passed (warnings allowed)
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .collect()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Format all issues for display
    pub fn format_issues(&self) -> String {
        self.issues
            .iter()
            .map(|i| i.format())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Structured form: `{"valid": bool, "errors": [...], "warnings": [...]}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "valid": self.is_valid(),
            "errors": self.errors(),
            "warnings": self.warnings(),
        })
    }
}
