#![allow(clippy::collapsible_if, clippy::type_complexity)]
pub mod category;
pub mod compress;
pub mod coordinator;
pub mod dimension;
pub mod executor;
pub mod master;
pub mod navigation;
pub mod phase;
pub mod sort;

pub use category::{CategoryIndex, LabelOrder};
pub use coordinator::{BuildInput, IndexCoordinator, LibraryIndexes};
pub use dimension::{Annotations, BuildContext, DimensionBuilder, DimensionOutput};
pub use phase::BuildPhase;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("task {task} panicked")]
    TaskPanicked { task: String },

    #[error("task join failed: {0}")]
    Join(String),

    #[error("set '{0}' has no members")]
    EmptySet(String),
}
