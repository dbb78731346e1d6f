/// A file patch split into the line lists stored on a `FileChange`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffLines {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub full: Vec<String>,
}

/// Classify the lines of a per-file patch as returned by the GitHub files endpoint.
///
/// The patch has no `diff --git` header; it starts directly at the first hunk.
/// A line counts as added when it starts with '+' and as removed when it starts
/// with '-', except for the `+++` / `---` file header lines. Prefixes are kept.
pub fn classify_patch(patch: &str) -> DiffLines {
    if patch.is_empty() {
        return DiffLines::default();
    }

    let mut lines = DiffLines::default();
    for line in patch.split('\n') {
        if line.starts_with('+') && !line.starts_with("+++") {
            lines.added.push(line.to_string());
        } else if line.starts_with('-') && !line.starts_with("---") {
            lines.removed.push(line.to_string());
        }
        lines.full.push(line.to_string());
    }
    lines
}
