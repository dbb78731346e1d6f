pub mod chunk;
pub mod embed;
pub mod format;
pub mod index;

pub use chunk::Chunker;
pub use embed::Embedder;
pub use format::{truncate_text, PrFormatter};
pub use index::{IndexError, VectorIndex};

use tracing::info;

use crate::pr::PullRequest;

/// Format, chunk and embed `prs` into a fresh in-memory index.
pub async fn index_prs(
    prs: &[PullRequest],
    formatter: &PrFormatter,
    chunker: &Chunker,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, IndexError> {
    let texts = formatter.format_all(prs);
    let chunks = chunker.split(&texts);
    info!(prs = prs.len(), chunks = chunks.len(), "embedding PR text");
    VectorIndex::build(chunks, embedder).await
}
