use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use jukebox_core::error::ApiError;
use jukebox_core::IndexConfig;
use jukebox_index::{IndexCoordinator, LibraryIndexes};
use jukebox_library::Library;
use tokio::sync::RwLock;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IndexConfig>,
    pub library: Arc<RwLock<Library>>,
    /// Last successful build; replaced whole, never mutated in place.
    pub indexes: Arc<RwLock<Option<Arc<LibraryIndexes>>>>,
    pub building: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: IndexConfig, library: Library) -> Self {
        Self {
            config: Arc::new(config),
            library: Arc::new(RwLock::new(library)),
            indexes: Arc::new(RwLock::new(None)),
            building: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn coordinator(&self) -> IndexCoordinator {
        IndexCoordinator::new(self.config.clone())
    }

    /// The published indexes, or 503 before the first build finished.
    pub async fn current(&self) -> Result<Arc<LibraryIndexes>, ApiError> {
        self.indexes
            .read()
            .await
            .clone()
            .ok_or_else(|| ApiError::Unavailable("indexes have not been built yet".into()))
    }
}
