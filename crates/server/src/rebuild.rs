//! One index build against the current library, published atomically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use jukebox_core::error::ApiError;
use jukebox_index::BuildInput;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub build_id: String,
    pub built_at: DateTime<Utc>,
    pub items: usize,
    pub masters: usize,
    pub indexes: usize,
    pub elapsed_ms: u64,
}

/// Holds the single build slot; released on drop, even if the build fails.
struct BuildGuard(Arc<AtomicBool>);

impl BuildGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Snapshot the library, build, and swap the result in. A failed build
/// leaves the previous indexes published.
pub async fn run_build(state: &AppState) -> Result<BuildSummary, AppError> {
    let Some(_guard) = BuildGuard::acquire(&state.building) else {
        return Err(ApiError::Conflict("an index build is already running".into()).into());
    };
    let build_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let input = {
        let library = state.library.read().await;
        BuildInput::from_library(&library, Utc::now())
    };
    info!(build_id = %build_id, items = input.items.len(), "index build started");

    let built = match state.coordinator().build(input).await {
        Ok(built) => Arc::new(built),
        Err(e) => {
            error!(build_id = %build_id, error = %e, "index build failed");
            return Err(e.into());
        }
    };

    let summary = BuildSummary {
        build_id,
        built_at: built.built_at(),
        items: built.items().len(),
        masters: built.masters().len(),
        indexes: built.indexes().count(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    *state.indexes.write().await = Some(built);
    info!(
        build_id = %summary.build_id,
        masters = summary.masters,
        elapsed_ms = summary.elapsed_ms,
        "indexes published"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox_core::{IndexConfig, Item};
    use jukebox_library::Library;

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let first = BuildGuard::acquire(&flag).unwrap();
        assert!(BuildGuard::acquire(&flag).is_none());
        drop(first);
        assert!(BuildGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn build_publishes_indexes() {
        let mut library = Library::new();
        library.add_item(Item {
            title: "Heat".into(),
            year: Some("1995".into()),
            base_name: "Heat".into(),
            ..Default::default()
        });
        let state = AppState::new(IndexConfig::default(), library);
        assert!(state.current().await.is_err());

        let summary = run_build(&state).await.ok().unwrap();
        assert_eq!(summary.items, 1);
        assert_eq!(summary.masters, 0);
        assert!(!state.building.load(Ordering::Acquire));
        assert_eq!(state.current().await.unwrap().items().len(), 1);
    }

    #[tokio::test]
    async fn busy_slot_is_a_conflict() {
        let state = AppState::new(IndexConfig::default(), Library::new());
        state.building.store(true, Ordering::Release);
        let err = run_build(&state).await.err().unwrap();
        assert_eq!(err.0.status_code(), 409);
    }
}
