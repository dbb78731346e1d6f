pub mod confidence;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};

use crate::llm::{ChatModel, LlmError};
use crate::pr::PullRequest;
use crate::rag::index::ScoredChunk;
use crate::rag::{truncate_text, Embedder, IndexError, PrFormatter, VectorIndex};

pub const SYSTEM_PROMPT: &str =
    "You are an AI that evaluates PRs and provides a merge recommendation.";

#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("Failed to retrieve similar closed PRs: {0}")]
    Retrieval(#[from] IndexError),

    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergePrediction {
    pub response: String,
    /// Confidence from the phrase table, e.g. "85%"
    pub merge_percentage: String,
    #[serde(skip)]
    pub confidence: u8,
}

/// Result for one open PR. A failure is kept per PR so the rest of the batch still runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Predicted(MergePrediction),
    Failed { error: String },
}

pub type MergePredictions = BTreeMap<u64, PredictionOutcome>;

/// Scores open PRs against retrieved closed-PR history with a chat model.
pub struct MergeEvaluator<'a> {
    model: &'a dyn ChatModel,
    embedder: &'a dyn Embedder,
    formatter: PrFormatter,
    top_k: usize,
}

impl<'a> MergeEvaluator<'a> {
    pub fn new(
        model: &'a dyn ChatModel,
        embedder: &'a dyn Embedder,
        formatter: PrFormatter,
        top_k: usize,
    ) -> Self {
        Self {
            model,
            embedder,
            formatter,
            top_k,
        }
    }

    /// Similarity query for one PR: its title and touched file names.
    pub fn retrieval_query(&self, pr: &PullRequest) -> String {
        let mut parts = Vec::with_capacity(pr.file_changes.len() + 1);
        if !pr.title.trim().is_empty() {
            parts.push(pr.title.clone());
        }
        parts.extend(pr.file_changes.iter().map(|fc| fc.filename.clone()));
        if parts.is_empty() {
            format!("PR {}", pr.number)
        } else {
            parts.join(" ")
        }
    }

    pub fn build_prompt(&self, pr: &PullRequest, context: &[ScoredChunk]) -> String {
        let max = self.formatter.max_len;
        let created = pr
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut prompt = String::new();
        prompt.push_str(
            "Analyze the following open PR based on past closed PRs and provide a merge recommendation.\n\n",
        );
        prompt.push_str("Open PR Details:\n");
        prompt.push_str(&format!(
            "PR Number: {}, Title: {}, State: {}, Author: {}, Created Date: {created}, \
             Base Branch: {}, Head Branch: {}, Merge Conflict: {}, \
             Lines Added: {}, Lines Removed: {}, File Changes: {}\n\n",
            pr.number,
            truncate_text(&pr.title, max),
            pr.state,
            pr.author,
            pr.base_branch,
            pr.head_branch,
            pr.merge_conflict,
            pr.additions(),
            pr.deletions(),
            truncate_text(&self.formatter.file_summary(pr), max),
        ));

        prompt.push_str("Similar past closed PRs:\n");
        if context.is_empty() {
            prompt.push_str("(no historical context available)\n");
        } else {
            for chunk in context {
                prompt.push_str("- ");
                prompt.push_str(&chunk.text);
                prompt.push('\n');
            }
        }

        prompt.push_str(
            "\n- If a merge conflict exists, assess if it can be resolved based on past cases.\n\
             - Provide insights on risks, necessary fixes, and best practices before merging.",
        );
        prompt
    }

    pub async fn evaluate(
        &self,
        pr: &PullRequest,
        closed_index: &VectorIndex,
    ) -> Result<MergePrediction, EvaluateError> {
        let query = self.retrieval_query(pr);
        let context = closed_index.query(&query, self.top_k, self.embedder).await?;
        let prompt = self.build_prompt(pr, &context);
        let response = self.model.complete(SYSTEM_PROMPT, &prompt).await?;
        let score = confidence::score(&response);
        Ok(MergePrediction {
            response,
            merge_percentage: confidence::as_percentage(score),
            confidence: score,
        })
    }

    /// Evaluate every open PR in order. Failures are recorded per PR.
    pub async fn evaluate_all(
        &self,
        open_prs: &[PullRequest],
        closed_index: &VectorIndex,
    ) -> MergePredictions {
        let mut predictions = MergePredictions::new();
        for pr in open_prs {
            let outcome = match self
                .evaluate(pr, closed_index)
                .instrument(info_span!("evaluate", pr = pr.number))
                .await
            {
                Ok(prediction) => {
                    info!(pr = pr.number, confidence = %prediction.merge_percentage, "evaluated PR");
                    PredictionOutcome::Predicted(prediction)
                }
                Err(e) => {
                    error!(pr = pr.number, error = %e, "evaluation failed");
                    PredictionOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            predictions.insert(pr.number, outcome);
        }
        predictions
    }
}
