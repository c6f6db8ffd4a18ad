use crate::completeness::{configured_threshold, format_report, generate_completeness_report, summary_line};
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(state_dir: &Path, json: bool, summary: bool, threshold: Option<u8>) -> Result<()> {
    let threshold = threshold.unwrap_or_else(|| configured_threshold(state_dir));
    let report = generate_completeness_report(state_dir, threshold);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if summary {
        println!("{}", summary_line(&report));
    } else {
        let text = format_report(&report);
        if report.is_complete {
            print!("{}", text.green());
        } else {
            print!("{}", text.yellow());
        }
    }
    Ok(())
}
