use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use jukebox_core::error::ApiError;
use jukebox_core::{Dimension, Entry, Item, ItemKind};
use jukebox_index::navigation::{LinkedEntry, Navigation};
use jukebox_index::{CategoryIndex, LibraryIndexes};
use jukebox_library::AddOutcome;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::rebuild::{run_build, BuildSummary};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Indexes
        .route("/indexes", get(list_indexes))
        .route("/indexes/{dimension}", get(get_index))
        .route("/indexes/{dimension}/{category}", get(get_category))
        .route("/default-category", get(default_category))
        // Items
        .route("/items", get(list_items).post(add_item))
        .route("/items/{base_name}/categories", get(item_categories))
        // Builds
        .route("/rebuild", post(rebuild))
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// What a client sees of one index entry.
#[derive(Serialize)]
struct EntryView {
    base_name: String,
    title: String,
    /// `item` or `set`.
    entry_type: &'static str,
    media: ItemKind,
    year: Option<String>,
    rating: Option<i32>,
    watched: bool,
    extra: bool,
    set_size: Option<usize>,
    poster: Option<String>,
}

impl From<&Entry> for EntryView {
    fn from(entry: &Entry) -> Self {
        let (entry_type, set_size, poster) = match entry {
            Entry::Item(item) => ("item", None, item.poster.clone()),
            Entry::Master(master) => ("set", Some(master.set_size()), Some(master.poster.clone())),
        };
        Self {
            base_name: entry.base_name().to_string(),
            title: entry.title().to_string(),
            entry_type,
            media: if entry.is_tv() {
                ItemKind::TvShow
            } else {
                ItemKind::Movie
            },
            year: entry.year().map(str::to_string),
            rating: entry.rating(),
            watched: entry.watched(),
            extra: entry.is_extra(),
            set_size,
            poster,
        }
    }
}

#[derive(Serialize)]
struct LinkedView {
    #[serde(flatten)]
    entry: EntryView,
    navigation: Navigation,
}

impl From<&LinkedEntry> for LinkedView {
    fn from(linked: &LinkedEntry) -> Self {
        Self {
            entry: EntryView::from(&linked.entry),
            navigation: linked.navigation.clone(),
        }
    }
}

#[derive(Serialize)]
struct IndexSummary {
    dimension: Dimension,
    display: bool,
    categories: usize,
    entries: usize,
}

#[derive(Serialize)]
struct CategorySummary {
    label: String,
    count: usize,
    /// Entries before set compression.
    uncompressed: Option<usize>,
}

#[derive(Serialize)]
struct IndexDetail {
    dimension: Dimension,
    display: bool,
    categories: Vec<CategorySummary>,
}

#[derive(Serialize)]
struct CategoryResponse {
    dimension: Dimension,
    category: String,
    entries: Vec<EntryView>,
}

#[derive(Serialize)]
struct ItemCategoriesResponse {
    base_name: String,
    categories: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct DefaultCategoryResponse {
    category: Option<String>,
}

#[derive(Serialize)]
struct AddItemResponse {
    key: String,
    outcome: AddOutcome,
}

fn parse_dimension(name: &str) -> Result<Dimension, ApiError> {
    Dimension::from_str(name)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown dimension: {name}")))
}

fn find_index(built: &LibraryIndexes, dimension: Dimension) -> Result<&CategoryIndex, ApiError> {
    built
        .index(dimension)
        .ok_or_else(|| ApiError::NotFound(format!("dimension {dimension} was not built")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn list_indexes(State(state): State<AppState>) -> Result<Json<Vec<IndexSummary>>, AppError> {
    let built = state.current().await?;
    let summaries = built
        .indexes()
        .map(|index| IndexSummary {
            dimension: index.dimension(),
            display: index.display(),
            categories: index.len(),
            entries: index.entry_count(),
        })
        .collect();
    Ok(Json(summaries))
}

async fn get_index(
    State(state): State<AppState>,
    Path(dimension): Path<String>,
) -> Result<Json<IndexDetail>, AppError> {
    let dimension = parse_dimension(&dimension)?;
    let built = state.current().await?;
    let index = find_index(&built, dimension)?;

    let categories = index
        .iter()
        .map(|(label, list)| CategorySummary {
            label: label.to_string(),
            count: list.len(),
            uncompressed: built.movie_count_for_index(dimension, label),
        })
        .collect();
    Ok(Json(IndexDetail {
        dimension,
        display: index.display(),
        categories,
    }))
}

async fn get_category(
    State(state): State<AppState>,
    Path((dimension, category)): Path<(String, String)>,
) -> Result<Json<CategoryResponse>, AppError> {
    let dimension = parse_dimension(&dimension)?;
    let built = state.current().await?;
    let entries = find_index(&built, dimension)?
        .get(&category)
        .ok_or_else(|| ApiError::NotFound(format!("category {category} not found in {dimension}")))?;

    Ok(Json(CategoryResponse {
        dimension,
        entries: entries.iter().map(EntryView::from).collect(),
        category,
    }))
}

async fn default_category(
    State(state): State<AppState>,
) -> Result<Json<DefaultCategoryResponse>, AppError> {
    let built = state.current().await?;
    Ok(Json(DefaultCategoryResponse {
        category: built.default_category().map(str::to_string),
    }))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<LinkedView>>, AppError> {
    let built = state.current().await?;
    Ok(Json(built.items().iter().map(LinkedView::from).collect()))
}

async fn item_categories(
    State(state): State<AppState>,
    Path(base_name): Path<String>,
) -> Result<Json<ItemCategoriesResponse>, AppError> {
    let built = state.current().await?;
    let categories = built.annotations().get(&base_name).cloned();
    let categories = match categories {
        Some(categories) => categories,
        None if built.linked(&base_name).is_some() => BTreeMap::new(),
        None => return Err(ApiError::NotFound(format!("no entry named {base_name}")).into()),
    };
    Ok(Json(ItemCategoriesResponse {
        base_name,
        categories,
    }))
}

async fn add_item(
    State(state): State<AppState>,
    Json(item): Json<Item>,
) -> Result<(StatusCode, Json<AddItemResponse>), AppError> {
    if item.title.trim().is_empty() {
        return Err(ApiError::BadRequest("item title must not be empty".into()).into());
    }
    let key = item.key();
    let outcome = {
        let mut library = state.library.write().await;
        let outcome = library.add_item(item);
        if outcome == AddOutcome::Extra {
            library.merge_extras();
        }
        outcome
    };
    info!(key = %key, outcome = ?outcome, "item added");
    Ok((StatusCode::CREATED, Json(AddItemResponse { key, outcome })))
}

async fn rebuild(State(state): State<AppState>) -> Result<Json<BuildSummary>, AppError> {
    run_build(&state).await.map(Json)
}
