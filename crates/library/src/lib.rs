#![allow(clippy::collapsible_if)]
pub mod catalog;
pub mod repository;

pub use repository::{AddOutcome, Library};

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),
}
