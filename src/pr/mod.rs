pub mod comments;
pub mod diff;
pub mod types;

pub use types::{Comment, Fetched, FileChange, FileStatus, PrState, PullRequest};
