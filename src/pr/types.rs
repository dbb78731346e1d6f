use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which pull requests a fetch targets, and the state recorded on each PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    #[default]
    Open,
    Closed,
    Merged,
}

impl PrState {
    /// The value GitHub's `state` query parameter expects.
    /// Merged PRs are listed under `closed`.
    pub fn query_value(self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Closed | PrState::Merged => "closed",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// Per-file status as reported by the pull-request files endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileStatus {
    Added,
    #[default]
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    Other(String),
}

impl From<String> for FileStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "added" => FileStatus::Added,
            "modified" => FileStatus::Modified,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            "copied" => FileStatus::Copied,
            "changed" => FileStatus::Changed,
            "unchanged" => FileStatus::Unchanged,
            _ => FileStatus::Other(value),
        }
    }
}

impl From<FileStatus> for String {
    fn from(value: FileStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Removed => "removed",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::Changed => "changed",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Other(other) => other.as_str(),
        };
        f.write_str(label)
    }
}

/// A pull request as fetched from GitHub and stored in the raw JSON files.
///
/// Field names on disk follow the raw-store format ("PR Number", "Title", ...).
/// Every field has a default so partially written files still load; the text
/// formatter substitutes placeholders for the empty ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    #[serde(rename = "PR Number")]
    pub number: u64,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "State")]
    pub state: PrState,
    /// Author's GitHub login
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Created Date")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "Merged Date")]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(rename = "Base Branch")]
    pub base_branch: String,
    #[serde(rename = "Head Branch")]
    pub head_branch: String,
    /// True only when GitHub reported the PR as not mergeable
    #[serde(rename = "Merge Conflict")]
    pub merge_conflict: bool,
    #[serde(rename = "File Changes")]
    pub file_changes: Vec<FileChange>,
    /// Earlier half of the comments, ordered by creation time
    #[serde(rename = "Old Comments")]
    pub old_comments: Vec<Comment>,
    #[serde(rename = "New Comments")]
    pub new_comments: Vec<Comment>,
}

impl PullRequest {
    pub fn comment_count(&self) -> usize {
        self.old_comments.len() + self.new_comments.len()
    }

    pub fn additions(&self) -> usize {
        self.file_changes.iter().map(|f| f.added_lines.len()).sum()
    }

    pub fn deletions(&self) -> usize {
        self.file_changes.iter().map(|f| f.removed_lines.len()).sum()
    }
}

/// One file touched by a pull request, with its patch split by line kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChange {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Status")]
    pub status: FileStatus,
    /// Lines starting with a single '+', prefix kept
    #[serde(rename = "Added Lines")]
    pub added_lines: Vec<String>,
    /// Lines starting with a single '-', prefix kept
    #[serde(rename = "Removed Lines")]
    pub removed_lines: Vec<String>,
    #[serde(rename = "Full Diff")]
    pub full_diff: Vec<String>,
}

/// An issue comment on a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Created At")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "Body")]
    pub body: String,
}

/// Result of an upstream fetch that may have degraded part of its data.
///
/// `partial` is set whenever some unit fell back to empty data; `errors`
/// says which and why, so callers can tell "no data" from "fetch failed".
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub partial: bool,
    pub errors: Vec<String>,
}

impl<T> Fetched<T> {
    pub fn complete(data: T) -> Self {
        Self {
            data,
            partial: false,
            errors: Vec::new(),
        }
    }

    pub fn degraded(data: T, error: impl Into<String>) -> Self {
        Self {
            data,
            partial: true,
            errors: vec![error.into()],
        }
    }

    /// Record a degraded unit while keeping the data collected so far.
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.partial = true;
        self.errors.push(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_uses_raw_store_keys() {
        let pr = PullRequest {
            number: 7,
            title: "Fix bug".to_string(),
            merge_conflict: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&pr).unwrap();
        assert_eq!(value["PR Number"], 7);
        assert_eq!(value["Title"], "Fix bug");
        assert_eq!(value["State"], "open");
        assert_eq!(value["Merge Conflict"], true);
        assert!(value["Merged Date"].is_null());
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let pr: PullRequest = serde_json::from_str(r#"{"PR Number": 3}"#).unwrap();
        assert_eq!(pr.number, 3);
        assert!(pr.title.is_empty());
        assert!(pr.created_at.is_none());
        assert!(pr.file_changes.is_empty());
    }

    #[test]
    fn test_file_status_keeps_unknown_values() {
        let status: FileStatus = serde_json::from_str("\"added\"").unwrap();
        assert_eq!(status, FileStatus::Added);
        let status: FileStatus = serde_json::from_str("\"moved\"").unwrap();
        assert_eq!(status, FileStatus::Other("moved".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"moved\"");
    }

    #[test]
    fn test_state_query_value() {
        assert_eq!(PrState::Open.query_value(), "open");
        assert_eq!(PrState::Merged.query_value(), "closed");
        assert_eq!(PrState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_fetched_push_error_marks_partial() {
        let mut fetched = Fetched::complete(vec![1, 2]);
        assert!(!fetched.partial);
        fetched.push_error("comments for #2: 404");
        assert!(fetched.partial);
        assert_eq!(fetched.data, vec![1, 2]);
        assert_eq!(fetched.errors.len(), 1);
    }
}
