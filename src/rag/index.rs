use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::embed::{cosine_similarity, EmbedError, Embedder};
use crate::pr::PrState;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Similarity query must not be empty; use entries() to enumerate the index")]
    EmptyQuery,

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("Index was built with embedding model {index} but queried with {embedder}")]
    ModelMismatch { index: String, embedder: String },

    #[error("Failed to access index file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid index file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the persisted index for a PR state lives.
pub fn index_path(data_dir: &Path, state: PrState) -> PathBuf {
    data_dir
        .join("embeddings")
        .join(format!("{state}_pr"))
        .join("index.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

/// Brute-force cosine-similarity index over embedded text chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    model_id: String,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Embed every chunk and keep the (chunk, vector) pairs in insertion order.
    #[instrument(skip(chunks, embedder), fields(chunks = chunks.len(), model = embedder.model_id()))]
    pub async fn build(chunks: Vec<String>, embedder: &dyn Embedder) -> Result<Self, IndexError> {
        let vectors = embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbedError::CountMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            }
            .into());
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| IndexedChunk { text, vector })
            .collect::<Vec<_>>();
        debug!(entries = entries.len(), "built vector index");

        Ok(Self {
            model_id: embedder.model_id().to_string(),
            entries,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Every indexed chunk, in insertion order.
    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first. Equal scores keep
    /// insertion order.
    pub async fn query(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if query.trim().is_empty() {
            return Err(IndexError::EmptyQuery);
        }
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if embedder.model_id() != self.model_id {
            return Err(IndexError::ModelMismatch {
                index: self.model_id.clone(),
                embedder: embedder.model_id().to_string(),
            });
        }

        let query_vector = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedError::CountMismatch { expected: 1, got: 0 })?;

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                text: entry.text.clone(),
                score: cosine_similarity(&query_vector, &entry.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| IndexError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string(self).map_err(|source| IndexError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), entries = self.entries.len(), "vector index persisted");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let contents = fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| IndexError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embed::HashEmbedder;

    fn chunks() -> Vec<String> {
        vec![
            "PR Number: 1, Title: Fix parser crash on empty input".to_string(),
            "PR Number: 2, Title: Update README badges".to_string(),
            "PR Number: 3, Title: Refactor parser error handling".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_build_keeps_insertion_order() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(chunks(), &embedder).await.unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.model_id(), "local-hash-384");
        let texts: Vec<&str> = index.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, chunks().iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_query_ranks_similar_chunks_first() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(chunks(), &embedder).await.unwrap();
        let results = index.query("parser crash", 2, &embedder).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].text.contains("parser crash"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_query_caps_at_index_size() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(chunks(), &embedder).await.unwrap();
        let results = index.query("anything", 10, &embedder).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(chunks(), &embedder).await.unwrap();
        let err = index.query("   ", 4, &embedder).await.unwrap_err();
        assert!(matches!(err, IndexError::EmptyQuery));
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(Vec::new(), &embedder).await.unwrap();
        assert!(index.is_empty());
        assert!(index.query("parser", 4, &embedder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_mismatch_is_rejected() {
        let index = VectorIndex::build(chunks(), &HashEmbedder::new(64)).await.unwrap();
        let err = index
            .query("parser", 1, &HashEmbedder::new(128))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::ModelMismatch { .. }));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_path(dir.path(), PrState::Closed);
        assert!(path.ends_with("embeddings/closed_pr/index.json"));

        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(chunks(), &embedder).await.unwrap();
        index.save(&path).unwrap();
        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }
}
