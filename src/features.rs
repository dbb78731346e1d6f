//! Tabular per-PR features for offline analysis, exported as CSV.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::pr::{PrState, PullRequest};

const KEYWORDS: &[&str] = &["fix", "bug", "feature", "refactor"];

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid text pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrFeatures {
    pub number: u64,
    pub title_length: usize,
    pub num_keywords: usize,
    pub state: PrState,
    pub merged: bool,
    pub created_at: String,
    pub comments: usize,
    pub changed_files: usize,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub merge_conflict: bool,
}

/// Derives [`PrFeatures`] from PR records.
pub struct FeatureExtractor {
    url: Regex,
    special_chars: Regex,
}

impl FeatureExtractor {
    pub fn new() -> Result<Self, FeatureError> {
        Ok(Self {
            url: Regex::new(r"http\S+")?,
            special_chars: Regex::new(r"[^a-zA-Z0-9\s]")?,
        })
    }

    /// Lower-case, drop URLs and non-alphanumerics, collapse whitespace.
    pub fn clean_text(&self, text: &str) -> String {
        let without_urls = self.url.replace_all(text, "");
        let alnum = self.special_chars.replace_all(&without_urls, "");
        alnum
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    pub fn extract(&self, pr: &PullRequest) -> PrFeatures {
        let title = self.clean_text(&pr.title);
        PrFeatures {
            number: pr.number,
            title_length: title.split_whitespace().count(),
            num_keywords: KEYWORDS.iter().filter(|k| title.contains(*k)).count(),
            state: pr.state,
            merged: pr.state == PrState::Merged,
            created_at: pr.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            comments: pr.comment_count(),
            changed_files: pr.file_changes.len(),
            lines_added: pr.additions(),
            lines_deleted: pr.deletions(),
            merge_conflict: pr.merge_conflict,
        }
    }

    pub fn extract_all(&self, prs: &[PullRequest]) -> Vec<PrFeatures> {
        prs.iter().map(|pr| self.extract(pr)).collect()
    }
}

pub fn default_output_path(data_dir: &Path, repo: &str, state: PrState) -> PathBuf {
    data_dir
        .join("processed")
        .join(format!("{repo}_{state}_features.csv"))
}

/// Write one header row and one row per PR, creating parent directories.
pub fn save_csv(rows: &[PrFeatures], path: &Path) -> Result<(), FeatureError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| FeatureError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| FeatureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = rows.len(), "processed PR data saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::{Comment, FileChange};

    #[test]
    fn test_clean_text() {
        let extractor = FeatureExtractor::new().unwrap();
        assert_eq!(
            extractor.clean_text("Fix: crash (see https://example.com/x)   in  Parser!"),
            "fix crash see in parser"
        );
        assert_eq!(extractor.clean_text(""), "");
    }

    #[test]
    fn test_extract_features() {
        let pr = PullRequest {
            number: 12,
            title: "Fix bug in feature flags".to_string(),
            state: PrState::Merged,
            merge_conflict: true,
            file_changes: vec![FileChange {
                filename: "a.rs".to_string(),
                added_lines: vec!["+a".to_string(), "+b".to_string()],
                removed_lines: vec!["-c".to_string()],
                ..Default::default()
            }],
            old_comments: vec![Comment::default()],
            new_comments: vec![Comment::default(), Comment::default()],
            ..Default::default()
        };
        let features = FeatureExtractor::new().unwrap().extract(&pr);
        assert_eq!(features.number, 12);
        assert_eq!(features.title_length, 5);
        assert_eq!(features.num_keywords, 3);
        assert!(features.merged);
        assert_eq!(features.comments, 3);
        assert_eq!(features.changed_files, 1);
        assert_eq!(features.lines_added, 2);
        assert_eq!(features.lines_deleted, 1);
        assert!(features.merge_conflict);
    }

    #[test]
    fn test_save_csv_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_output_path(dir.path(), "widgets", PrState::Closed);
        let prs = vec![
            PullRequest {
                number: 1,
                title: "Refactor".to_string(),
                ..Default::default()
            },
            PullRequest {
                number: 2,
                ..Default::default()
            },
        ];
        let rows = FeatureExtractor::new().unwrap().extract_all(&prs);
        save_csv(&rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("number,title_length,num_keywords,state,merged"));
        assert!(lines[1].starts_with("1,1,1,open,false"));
    }
}
