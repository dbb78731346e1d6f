use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::pr::{PrState, PullRequest};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid PR data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw PR JSON files under `{data_dir}/raw/{state}_pr/`.
#[derive(Debug, Clone)]
pub struct RawStore {
    data_dir: PathBuf,
}

impl RawStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Deterministic location for one repository's PRs in one state.
    pub fn path_for(&self, repo: &str, state: PrState) -> PathBuf {
        self.data_dir
            .join("raw")
            .join(format!("{state}_pr"))
            .join(format!("{repo}_all_{state}_prs.json"))
    }

    /// Write `prs`, replacing any previous file. With no records nothing is
    /// written and `None` is returned.
    #[instrument(skip(self, prs), fields(count = prs.len()))]
    pub fn save(
        &self,
        repo: &str,
        state: PrState,
        prs: &[PullRequest],
    ) -> Result<Option<PathBuf>, StoreError> {
        if prs.is_empty() {
            info!("no {state} PRs found, nothing saved");
            return Ok(None);
        }

        let path = self.path_for(repo, state);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(prs).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "PR details saved");
        Ok(Some(path))
    }

    pub fn load_repo(&self, repo: &str, state: PrState) -> Result<Vec<PullRequest>, StoreError> {
        load(&self.path_for(repo, state))
    }
}

/// Read PR records from a raw JSON file. A missing file is not an error: it
/// is logged and yields no records.
pub fn load(path: &Path) -> Result<Vec<PullRequest>, StoreError> {
    if !path.exists() {
        warn!(path = %path.display(), "PR data file not found");
        return Ok(Vec::new());
    }

    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let prs: Vec<PullRequest> =
        serde_json::from_str(&contents).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), count = prs.len(), "loaded PR data");
    Ok(prs)
}
