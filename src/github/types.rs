//! Response shapes for the GitHub REST endpoints the fetcher consumes.
//! Only the fields the pipeline reads are declared.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// One entry of `GET /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPull {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    /// Null for deleted ("ghost") accounts
    pub user: Option<ApiUser>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    pub base: ApiBranchRef,
    pub head: ApiBranchRef,
    /// Absent from list responses; only the single-PR endpoint computes it.
    #[serde(default)]
    pub mergeable: Option<bool>,
}

/// One entry of `GET /repos/{owner}/{repo}/pulls/{number}/files`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiFile {
    pub filename: String,
    pub status: String,
    /// Missing for binary files and very large diffs
    #[serde(default)]
    pub patch: Option<String>,
}

/// One entry of `GET /repos/{owner}/{repo}/issues/{number}/comments`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiComment {
    pub user: Option<ApiUser>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub rate: RateStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateStatus {
    #[serde(default)]
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds when the window resets
    pub reset: i64,
}
