use std::path::PathBuf;

use thiserror::Error;

use crate::llm::ChatError;
use crate::selection::format_size;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),
    #[error("repository not found: {0}")]
    RepoNotFound(String),
    #[error("failed to load branch {branch}: {reason}")]
    BranchLoad { branch: String, reason: String },
    #[error("failed to fetch {path}: {reason}")]
    FileFetch { path: String, reason: String },
    #[error("total size {} exceeds the {} limit", human(.total), human(.limit))]
    SizeLimitExceeded { total: usize, limit: usize },
    #[error("{path} is {}, over the {} per-file limit", human_u64(.size), human_u64(.limit))]
    PerFileSizeExceeded { path: String, size: u64, limit: u64 },
    #[error("api key is not set")]
    MissingCredential,
    #[error("prompt is empty")]
    MissingPrompt,
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage: {0}")]
    Storage(String),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

pub type Result<T> = std::result::Result<T, Error>;

fn human(bytes: &usize) -> String {
    format_size(*bytes as u64)
}

fn human_u64(bytes: &u64) -> String {
    format_size(*bytes)
}
