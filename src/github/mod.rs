pub mod fetch;
pub mod rate;
pub mod types;

pub use fetch::fetch_all_prs;
pub use rate::{Pause, RateGuard, TokioPause};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::GitHubConfig;
use crate::pr::PrState;
use types::{ApiComment, ApiFile, ApiPull, RateLimitResponse};

const USER_AGENT: &str = "smartmerge";
const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("GitHub token not found in configuration or environment")]
    MissingToken,
}

/// Thin GitHub REST client: one authenticated GET per call, no retries.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    per_page: u32,
    guard: RateGuard,
    pauser: Arc<dyn Pause>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, GithubError> {
        let token = config.token.clone().ok_or(GithubError::MissingToken)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            per_page: config.per_page,
            guard: RateGuard::from_config(config),
            pauser: Arc::new(TokioPause),
        })
    }

    /// Replace the pause used by the rate guard.
    #[cfg(test)]
    pub fn with_pause(mut self, pauser: Arc<dyn Pause>) -> Self {
        self.pauser = pauser;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GithubError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                status: status.as_u16(),
                url,
                body: truncate_body(&body),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Query the quota and pause once if it is nearly exhausted.
    ///
    /// Fails open: if the quota cannot be read the run proceeds without waiting.
    #[instrument(skip(self))]
    pub async fn check_rate_limit(&self) {
        match self.get_json::<RateLimitResponse>("/rate_limit", &[]).await {
            Ok(limits) => {
                let reset_at = DateTime::<Utc>::from_timestamp(limits.rate.reset, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| limits.rate.reset.to_string());
                info!(
                    remaining = limits.rate.remaining,
                    limit = limits.rate.limit,
                    reset_at = %reset_at,
                    "GitHub API rate limit"
                );
                self.guard.check(limits.rate.remaining, self.pauser.as_ref()).await;
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch rate limit, proceeding with caution");
            }
        }
    }

    pub async fn list_pulls(
        &self,
        owner: &str,
        repo: &str,
        state: PrState,
        page: u32,
    ) -> Result<Vec<ApiPull>, GithubError> {
        let path = format!("/repos/{owner}/{repo}/pulls");
        let query = [
            ("state", state.query_value().to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ];
        self.get_json(&path, &query).await
    }

    pub async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ApiFile>, GithubError> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/files");
        self.get_json(&path, &[("per_page", self.per_page.to_string())])
            .await
    }

    pub async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ApiComment>, GithubError> {
        let path = format!("/repos/{owner}/{repo}/issues/{number}/comments");
        self.get_json(&path, &[("per_page", self.per_page.to_string())])
            .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() <= MAX {
        return body.to_string();
    }
    let mut out: String = body.chars().take(MAX).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_token() {
        let config = GitHubConfig::default();
        assert!(matches!(
            GitHubClient::new(&config),
            Err(GithubError::MissingToken)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = GitHubConfig {
            token: Some("t".to_string()),
            api_base_url: "http://localhost:1234/".to_string(),
            ..Default::default()
        };
        let client = GitHubClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
        assert_eq!(client.per_page, 100);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "x".repeat(250);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
    }
}
