use crate::pr::PullRequest;

pub const DEFAULT_TRUNCATE_LEN: usize = 300;
const ELLIPSIS: &str = "...";

/// Cut `text` to `max_len` characters and mark the cut with "...".
///
/// Counts characters, not bytes. Text already within the limit is returned
/// unchanged, so applying it twice only differs from once by the marker.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((byte_idx, _)) => format!("{}{ELLIPSIS}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Renders PR records into the one-line descriptions that get chunked and embedded.
#[derive(Debug, Clone, Copy)]
pub struct PrFormatter {
    pub max_len: usize,
}

impl Default for PrFormatter {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_TRUNCATE_LEN,
        }
    }
}

impl PrFormatter {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// `"a.py (modified) | b.rs (added)"`
    pub fn file_summary(&self, pr: &PullRequest) -> String {
        pr.file_changes
            .iter()
            .map(|fc| {
                let status = fc.status.to_string();
                format!(
                    "{} ({})",
                    or_placeholder(&fc.filename, "Unknown"),
                    or_placeholder(&status, "Unknown")
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Newer half of the discussion only: `"alice: looks good | bob: ..."`
    pub fn comment_summary(&self, pr: &PullRequest) -> String {
        pr.new_comments
            .iter()
            .map(|c| {
                format!(
                    "{}: {}",
                    or_placeholder(&c.user, "Unknown"),
                    truncate_text(&c.body, self.max_len)
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn format(&self, pr: &PullRequest) -> String {
        let number = if pr.number == 0 {
            "N/A".to_string()
        } else {
            pr.number.to_string()
        };
        let created = pr
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string());
        let merged = pr
            .merged_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "PR Number: {number}, Title: {}, State: {}, Author: {}, Created Date: {created}, \
             Merged Date: {merged}, Base Branch: {}, Head Branch: {}, Merge Conflict: {}, \
             File Changes: {}, Comments: {}",
            truncate_text(or_placeholder(&pr.title, "No Title"), self.max_len),
            pr.state,
            or_placeholder(&pr.author, "Unknown"),
            or_placeholder(&pr.base_branch, "Unknown"),
            or_placeholder(&pr.head_branch, "Unknown"),
            pr.merge_conflict,
            truncate_text(&self.file_summary(pr), self.max_len),
            truncate_text(&self.comment_summary(pr), self.max_len),
        )
    }

    pub fn format_all(&self, prs: &[PullRequest]) -> Vec<String> {
        prs.iter().map(|pr| self.format(pr)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::{Comment, FileChange, FileStatus, PrState};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_text("hello", 300), "hello");
        let exact = "a".repeat(300);
        assert_eq!(truncate_text(&exact, 300), exact);
    }

    #[test]
    fn test_truncate_301_chars() {
        let text = "b".repeat(301);
        let truncated = truncate_text(&text, 300);
        assert_eq!(truncated, format!("{}...", "b".repeat(300)));
        assert_eq!(truncated.chars().count(), 303);
    }

    #[test]
    fn test_truncate_is_idempotent_within_limit() {
        let once = truncate_text(&"c".repeat(120), 300);
        assert_eq!(truncate_text(&once, 300), once);
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "é".repeat(5);
        assert_eq!(truncate_text(&text, 3), "ééé...");
        assert_eq!(truncate_text(&text, 5), text);
    }

    #[test]
    fn test_format_full_record() {
        let pr = PullRequest {
            number: 42,
            title: "Fix bug".to_string(),
            state: PrState::Merged,
            author: "alice".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            merged_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap()),
            base_branch: "main".to_string(),
            head_branch: "fix".to_string(),
            merge_conflict: false,
            file_changes: vec![
                FileChange {
                    filename: "a.py".to_string(),
                    status: FileStatus::Modified,
                    ..Default::default()
                },
                FileChange {
                    filename: "b.py".to_string(),
                    status: FileStatus::Added,
                    ..Default::default()
                },
            ],
            old_comments: vec![Comment {
                user: "old".to_string(),
                body: "hidden".to_string(),
                created_at: None,
            }],
            new_comments: vec![Comment {
                user: "bob".to_string(),
                body: "LGTM".to_string(),
                created_at: None,
            }],
        };

        let text = PrFormatter::default().format(&pr);
        assert!(text.starts_with("PR Number: 42, Title: Fix bug, State: merged, Author: alice"));
        assert!(text.contains("Created Date: 2025-01-01T00:00:00+00:00"));
        assert!(text.contains("Merged Date: 2025-01-02T00:00:00+00:00"));
        assert!(text.contains("Base Branch: main, Head Branch: fix, Merge Conflict: false"));
        assert!(text.contains("File Changes: a.py (modified) | b.py (added)"));
        assert!(text.ends_with("Comments: bob: LGTM"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_format_missing_fields_use_placeholders() {
        let text = PrFormatter::default().format(&PullRequest::default());
        assert!(text.contains("PR Number: N/A"));
        assert!(text.contains("Title: No Title"));
        assert!(text.contains("Author: Unknown"));
        assert!(text.contains("Created Date: Unknown"));
        assert!(text.contains("Merged Date: N/A"));
        assert!(text.contains("Base Branch: Unknown"));
    }

    #[test]
    fn test_format_truncates_long_fields() {
        let pr = PullRequest {
            number: 1,
            title: "t".repeat(400),
            new_comments: vec![Comment {
                user: "u".to_string(),
                body: "x".repeat(400),
                created_at: None,
            }],
            ..Default::default()
        };
        let formatter = PrFormatter::new(300);
        let text = formatter.format(&pr);
        assert!(text.contains(&format!("Title: {}...,", "t".repeat(300))));
        assert!(!text.contains(&"t".repeat(301)));
        assert!(!text.contains(&"x".repeat(301)));
    }
}
