//! Recoverability scoring
//!
//! File presence and state-field presence are scored independently (0-100
//! each) and averaged into a composite. Consistency findings are reported
//! alongside but never change the score.

pub mod report;
pub mod scorer;

pub use report::{
    configured_threshold, format_report, generate_completeness_report, get_completeness_json,
    get_completeness_summary, is_recovery_complete, summary_line,
};
pub use scorer::{
    calculate_completeness_score, calculate_file_score, calculate_state_score,
    check_optional_files, check_required_files, check_state_consistency, missing_state_fields,
};
