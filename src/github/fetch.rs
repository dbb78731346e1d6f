use tracing::{error, info, instrument, warn};

use super::types::{ApiComment, ApiFile, ApiPull};
use super::GitHubClient;
use crate::pr::comments::split_comments;
use crate::pr::diff::classify_patch;
use crate::pr::{Comment, Fetched, FileChange, FileStatus, PrState, PullRequest};

/// Fetch every pull request of `owner/repo` in `state`, with file diffs and comments.
///
/// Pages through the listing until an empty page. A failed page stops the
/// listing (records gathered so far are kept). A failed per-PR sub-fetch
/// empties only that field. Both cases mark the result partial.
#[instrument(skip(client))]
pub async fn fetch_all_prs(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    state: PrState,
) -> Fetched<Vec<PullRequest>> {
    client.check_rate_limit().await;

    let mut fetched = Fetched::complete(Vec::new());
    let mut page = 1;

    loop {
        let pulls = match client.list_pulls(owner, repo, state, page).await {
            Ok(pulls) => pulls,
            Err(e) => {
                error!(page, error = %e, "error fetching {state} PRs, stopping");
                fetched.push_error(format!("listing {state} PRs (page {page}): {e}"));
                break;
            }
        };

        if pulls.is_empty() {
            break;
        }

        let count = pulls.len();
        for pull in pulls {
            info!(pr = pull.number, "processing {state} PR");
            let pr = fetch_pull_details(client, owner, repo, pull, &mut fetched.errors).await;
            fetched.data.push(pr);
        }

        info!(page, count, "fetched page of PRs");
        page += 1;
    }

    if !fetched.errors.is_empty() {
        fetched.partial = true;
    }
    info!(
        total = fetched.data.len(),
        partial = fetched.partial,
        "finished fetching {state} PRs"
    );
    fetched
}

async fn fetch_pull_details(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    pull: ApiPull,
    errors: &mut Vec<String>,
) -> PullRequest {
    let number = pull.number;

    let files = fetch_file_changes(client, owner, repo, number).await;
    errors.extend(files.errors);

    let comments = fetch_comments(client, owner, repo, number).await;
    errors.extend(comments.errors);
    let (old_comments, new_comments) = comments.data;

    let state = if pull.merged_at.is_some() {
        PrState::Merged
    } else if pull.state == "closed" {
        PrState::Closed
    } else {
        PrState::Open
    };

    PullRequest {
        number,
        title: pull.title,
        state,
        author: pull.user.map(|u| u.login).unwrap_or_default(),
        created_at: pull.created_at,
        merged_at: pull.merged_at,
        base_branch: pull.base.name,
        head_branch: pull.head.name,
        merge_conflict: pull.mergeable == Some(false),
        file_changes: files.data,
        old_comments,
        new_comments,
    }
}

/// File-level diffs for one PR; degrades to an empty list on failure.
pub async fn fetch_file_changes(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    number: u64,
) -> Fetched<Vec<FileChange>> {
    match client.list_files(owner, repo, number).await {
        Ok(files) => Fetched::complete(files.into_iter().map(to_file_change).collect()),
        Err(e) => {
            warn!(pr = number, error = %e, "error fetching file changes");
            Fetched::degraded(Vec::new(), format!("file changes for PR #{number}: {e}"))
        }
    }
}

/// Issue comments for one PR split into (old, new); degrades to two empty halves.
pub async fn fetch_comments(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    number: u64,
) -> Fetched<(Vec<Comment>, Vec<Comment>)> {
    match client.list_issue_comments(owner, repo, number).await {
        Ok(comments) => {
            let comments = comments.into_iter().map(to_comment).collect();
            Fetched::complete(split_comments(comments))
        }
        Err(e) => {
            warn!(pr = number, error = %e, "error fetching comments");
            Fetched::degraded(
                (Vec::new(), Vec::new()),
                format!("comments for PR #{number}: {e}"),
            )
        }
    }
}

fn to_file_change(file: ApiFile) -> FileChange {
    let lines = classify_patch(file.patch.as_deref().unwrap_or_default());
    FileChange {
        filename: file.filename,
        status: FileStatus::from(file.status),
        added_lines: lines.added,
        removed_lines: lines.removed,
        full_diff: lines.full,
    }
}

fn to_comment(comment: ApiComment) -> Comment {
    Comment {
        user: comment.user.map(|u| u.login).unwrap_or_default(),
        created_at: comment.created_at,
        body: comment.body.unwrap_or_default(),
    }
}
