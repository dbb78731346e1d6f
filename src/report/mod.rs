pub mod types;

pub use types::{ConfidenceBand, Report, ReportEntry};

use crate::evaluate::PredictionOutcome;
use crate::pipeline::PipelineOutcome;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from a pipeline run.
pub fn build(owner: &str, repo: &str, outcome: PipelineOutcome) -> Report {
    let entries = outcome
        .predictions
        .into_iter()
        .map(|(number, outcome)| ReportEntry { number, outcome })
        .collect();

    Report {
        repository: format!("{owner}/{repo}"),
        entries,
        fetch_errors: outcome.fetch_errors,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(repository = %report.repository, prs = report.entries.len()))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn print_terminal_report(report: &Report) {
    println!();
    println!("Merge predictions for {}", report.repository.bold());
    println!(
        "Open PRs: {} | Failed evaluations: {}",
        report.entries.len(),
        report.failed_count()
    );
    println!();

    if report.entries.is_empty() {
        println!("  No open PRs to evaluate.");
        println!();
    }

    for entry in &report.entries {
        match &entry.outcome {
            PredictionOutcome::Predicted(prediction) => {
                println!(
                    "═══ PR #{} ═══ Merge confidence: {}",
                    entry.number,
                    colorize_confidence(&prediction.merge_percentage, ConfidenceBand::from_score(prediction.confidence))
                );
                for line in prediction.response.lines() {
                    println!("  {line}");
                }
            }
            PredictionOutcome::Failed { error } => {
                println!("═══ PR #{} ═══ {}", entry.number, "evaluation failed".red().bold());
                println!("  {error}");
            }
        }
        println!();
    }

    if !report.fetch_errors.is_empty() {
        println!("{}", "Incomplete GitHub data:".yellow().bold());
        for error in &report.fetch_errors {
            println!("  • {error}");
        }
        println!();
    }
}

fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Merge predictions for {}\n\n", report.repository));
    md.push_str(&format!(
        "**Open PRs:** {} | **Failed evaluations:** {}\n\n",
        report.entries.len(),
        report.failed_count()
    ));

    for entry in &report.entries {
        md.push_str(&format!("## PR #{}\n\n", entry.number));
        match &entry.outcome {
            PredictionOutcome::Predicted(prediction) => {
                md.push_str(&format!(
                    "**Merge confidence: {} ({})**\n\n",
                    prediction.merge_percentage,
                    ConfidenceBand::from_score(prediction.confidence)
                ));
                md.push_str(&prediction.response);
                md.push_str("\n\n");
            }
            PredictionOutcome::Failed { error } => {
                md.push_str(&format!("**Evaluation failed:** {error}\n\n"));
            }
        }
    }

    if !report.fetch_errors.is_empty() {
        md.push_str("## Incomplete GitHub data\n\n");
        for error in &report.fetch_errors {
            md.push_str(&format!("- {error}\n"));
        }
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn colorize_confidence(percentage: &str, band: ConfidenceBand) -> colored::ColoredString {
    match band {
        ConfidenceBand::High => percentage.green().bold(),
        ConfidenceBand::Medium => percentage.yellow().bold(),
        ConfidenceBand::Low => percentage.red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{MergePrediction, MergePredictions};

    fn sample_outcome() -> PipelineOutcome {
        let mut predictions = MergePredictions::new();
        predictions.insert(
            42,
            PredictionOutcome::Predicted(MergePrediction {
                response: "Safe to merge after CI.".to_string(),
                merge_percentage: "85%".to_string(),
                confidence: 85,
            }),
        );
        predictions.insert(
            7,
            PredictionOutcome::Failed {
                error: "Model call failed".to_string(),
            },
        );
        PipelineOutcome {
            predictions,
            fetch_errors: vec!["comments for PR #7: 502".to_string()],
        }
    }

    #[test]
    fn test_build_orders_entries_by_number() {
        let report = build("octo", "widgets", sample_outcome());
        assert_eq!(report.repository, "octo/widgets");
        let numbers: Vec<u64> = report.entries.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![7, 42]);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.fetch_errors.len(), 1);
    }

    #[test]
    fn test_write_markdown_report() {
        let report = build("octo", "widgets", sample_outcome());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_markdown_report(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Merge predictions for octo/widgets"));
        assert!(content.contains("## PR #42"));
        assert!(content.contains("**Merge confidence: 85% (HIGH)**"));
        assert!(content.contains("Safe to merge after CI."));
        assert!(content.contains("**Evaluation failed:** Model call failed"));
        assert!(content.contains("- comments for PR #7: 502"));
    }

    #[test]
    fn test_terminal_report_does_not_panic() {
        let report = build("octo", "widgets", sample_outcome());
        print_terminal_report(&report);
        print_terminal_report(&build("octo", "empty", PipelineOutcome {
            predictions: MergePredictions::new(),
            fetch_errors: vec![],
        }));
    }

    #[test]
    fn test_output_to_file() {
        let report = build("octo", "widgets", sample_outcome());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        output(&report, Some(&path)).unwrap();
        assert!(path.exists());
    }
}
