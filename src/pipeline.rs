use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, info_span, instrument, warn, Instrument};

use crate::config::{Config, ConfigError};
use crate::evaluate::{MergeEvaluator, MergePredictions};
use crate::features::{self, FeatureError, FeatureExtractor};
use crate::github::{fetch_all_prs, GitHubClient, GithubError};
use crate::llm::{ChatModel, LlmError, OpenAiChat};
use crate::pr::PrState;
use crate::rag::chunk::ChunkError;
use crate::rag::embed::{self, EmbedError};
use crate::rag::index::index_path;
use crate::rag::{index_prs, Chunker, Embedder, IndexError, PrFormatter};
use crate::store::{RawStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Github(#[from] GithubError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Everything one fetch-and-evaluate run produced.
#[derive(Debug, Serialize)]
pub struct PipelineOutcome {
    pub predictions: MergePredictions,
    /// Upstream failures that degraded part of the fetched data
    pub fetch_errors: Vec<String>,
}

/// Stored-data stages shared by every command: formatting, chunking, embedding.
pub struct Retrieval {
    pub store: RawStore,
    pub formatter: PrFormatter,
    pub chunker: Chunker,
    pub embedder: Box<dyn Embedder>,
    pub top_k: usize,
}

impl Retrieval {
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            store: RawStore::new(&config.storage.data_dir),
            formatter: PrFormatter::new(config.retrieval.truncate_len),
            chunker: Chunker::new(config.retrieval.chunk_size, config.retrieval.chunk_overlap)?,
            embedder: embed::from_config(&config.llm)?,
            top_k: config.retrieval.top_k,
        })
    }
}

/// Fetch, store, index and evaluate the pull requests of one repository.
pub struct Pipeline {
    github: GitHubClient,
    model: Box<dyn ChatModel>,
    retrieval: Retrieval,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            github: GitHubClient::new(&config.github)?,
            model: Box::new(OpenAiChat::new(&config.llm)?),
            retrieval: Retrieval::from_config(config)?,
        })
    }

    pub fn new(github: GitHubClient, model: Box<dyn ChatModel>, retrieval: Retrieval) -> Self {
        Self {
            github,
            model,
            retrieval,
        }
    }

    /// Fetch PRs in `state` and write them to the raw store. Returns the
    /// errors of any degraded units.
    pub async fn fetch_and_store(
        &self,
        owner: &str,
        repo: &str,
        state: PrState,
    ) -> Result<Vec<String>, PipelineError> {
        let fetched = fetch_all_prs(&self.github, owner, repo, state).await;
        if fetched.partial {
            warn!(errors = fetched.errors.len(), "{state} PR data is incomplete");
        }
        self.retrieval.store.save(repo, state, &fetched.data)?;
        Ok(fetched.errors)
    }

    /// Score the open PRs already stored for `repo` against its closed PRs.
    pub async fn evaluate_stored(&self, repo: &str) -> Result<MergePredictions, PipelineError> {
        let retrieval = &self.retrieval;
        let closed = retrieval.store.load_repo(repo, PrState::Closed)?;
        let open = retrieval.store.load_repo(repo, PrState::Open)?;
        info!(closed = closed.len(), open = open.len(), "loaded PR data");

        let index = index_prs(
            &closed,
            &retrieval.formatter,
            &retrieval.chunker,
            retrieval.embedder.as_ref(),
        )
        .await?;

        let evaluator = MergeEvaluator::new(
            self.model.as_ref(),
            retrieval.embedder.as_ref(),
            retrieval.formatter,
            retrieval.top_k,
        );
        Ok(evaluator.evaluate_all(&open, &index).await)
    }

    #[instrument(skip(self))]
    pub async fn process_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut fetch_errors = Vec::new();
        for state in [PrState::Closed, PrState::Open] {
            let errors = self
                .fetch_and_store(owner, repo, state)
                .instrument(info_span!("fetch", state = %state))
                .await?;
            fetch_errors.extend(errors);
        }

        let predictions = self.evaluate_stored(repo).await?;
        info!(predictions = predictions.len(), "repository processed");
        Ok(PipelineOutcome {
            predictions,
            fetch_errors,
        })
    }
}

/// Embed the stored closed and open PRs of `repo` and persist one index per state.
#[instrument(skip(retrieval, data_dir))]
pub async fn persist_indexes(
    retrieval: &Retrieval,
    data_dir: &Path,
    repo: &str,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::new();
    for state in [PrState::Closed, PrState::Open] {
        let prs = retrieval.store.load_repo(repo, state)?;
        let index = index_prs(
            &prs,
            &retrieval.formatter,
            &retrieval.chunker,
            retrieval.embedder.as_ref(),
        )
        .await?;
        info!(prs = prs.len(), chunks = index.len(), "created {state} PR chunks");

        let path = index_path(data_dir, state);
        index.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// Extract tabular features from stored PRs and write them as CSV.
pub fn export_features(
    store: &RawStore,
    data_dir: &Path,
    repo: &str,
    state: PrState,
    output: Option<&Path>,
) -> Result<PathBuf, PipelineError> {
    let prs = store.load_repo(repo, state)?;
    let rows = FeatureExtractor::new()?.extract_all(&prs);
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| features::default_output_path(data_dir, repo, state));
    features::save_csv(&rows, &path)?;
    Ok(path)
}
