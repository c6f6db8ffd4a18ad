//! One completeness computation, rendered three ways

use super::scorer::{
    calculate_file_score, calculate_state_score, check_optional_files, check_required_files,
    check_state_consistency, composite, missing_state_fields,
};
use crate::config::StoreConfig;
use crate::layout::STATE_FILE;
use crate::models::CompletenessReport;
use std::path::Path;

/// Compute the full report for `dir` against `threshold`
pub fn generate_completeness_report(dir: &Path, threshold: u8) -> CompletenessReport {
    let required = check_required_files(dir);
    let optional = check_optional_files(dir);
    let state_path = dir.join(STATE_FILE);
    let consistency = check_state_consistency(dir);

    let file_score = calculate_file_score(dir);
    let state_score = calculate_state_score(&state_path);
    let score = composite(file_score, state_score);

    let report = CompletenessReport {
        file_score,
        state_score,
        score,
        missing_files: required.missing,
        optional_present: optional.present,
        missing_fields: missing_state_fields(&state_path),
        consistent: consistency.consistent,
        consistency_warnings: consistency.warnings,
        threshold,
        is_complete: score >= threshold,
    };

    tracing::debug!(
        dir = %dir.display(),
        score = report.score,
        threshold,
        complete = report.is_complete,
        "completeness computed"
    );
    report
}

/// Whether the composite score of `dir` reaches `threshold`
pub fn is_recovery_complete(dir: &Path, threshold: u8) -> bool {
    generate_completeness_report(dir, threshold).is_complete
}

/// Threshold from `config.toml`, or the default when absent or unreadable
pub fn configured_threshold(dir: &Path) -> u8 {
    match StoreConfig::load(dir) {
        Ok(config) => config.recovery_threshold,
        Err(e) => {
            let fallback = StoreConfig::default().recovery_threshold;
            tracing::warn!(error = %e, fallback, "config unreadable, using default threshold");
            fallback
        }
    }
}

/// One-line summary
pub fn get_completeness_summary(dir: &Path, threshold: u8) -> String {
    summary_line(&generate_completeness_report(dir, threshold))
}

/// Structured form for machine consumers
pub fn get_completeness_json(dir: &Path, threshold: u8) -> serde_json::Value {
    let report = generate_completeness_report(dir, threshold);
    serde_json::to_value(&report).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}

pub fn summary_line(report: &CompletenessReport) -> String {
    format!(
        "completeness {}/100 (files {}, state {}) - {}",
        report.score,
        report.file_score,
        report.state_score,
        if report.is_complete {
            "recoverable"
        } else {
            "needs manual reconciliation"
        }
    )
}

/// Multi-line text report
pub fn format_report(report: &CompletenessReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Completeness score: {}/100\n", report.score));
    out.push_str(&format!("  File score:  {}/100\n", report.file_score));
    out.push_str(&format!("  State score: {}/100\n", report.state_score));

    if !report.missing_files.is_empty() {
        out.push_str(&format!("  Missing files: {}\n", report.missing_files.join(", ")));
    }
    if !report.optional_present.is_empty() {
        out.push_str(&format!(
            "  Optional files: {}\n",
            report.optional_present.join(", ")
        ));
    }
    if !report.missing_fields.is_empty() {
        out.push_str(&format!("  Missing fields: {}\n", report.missing_fields.join(", ")));
    }
    for warning in &report.consistency_warnings {
        out.push_str(&format!("  Warning: {}\n", warning));
    }

    out.push_str(&format!(
        "Recovery (threshold {}): {}\n",
        report.threshold,
        if report.is_complete {
            "complete"
        } else {
            "incomplete"
        }
    ));
    out
}
