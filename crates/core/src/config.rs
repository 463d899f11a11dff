//! Index engine configuration.
//!
//! Built once at startup and shared read-only (`Arc<IndexConfig>`) by the
//! coordinator and every builder.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::Dimension;

/// Canonical names of the property ("Other") categories.
pub mod category {
    pub const ALL: &str = "All";
    pub const NEW: &str = "New";
    pub const NEW_MOVIE: &str = "New-Movie";
    pub const NEW_TV: &str = "New-TV";
    pub const TOP250: &str = "Top250";
    pub const RATING: &str = "Rating";
    pub const WATCHED: &str = "Watched";
    pub const UNWATCHED: &str = "Unwatched";
    pub const HD: &str = "HD";
    pub const HD720: &str = "HD-720";
    pub const HD1080: &str = "HD-1080";
    pub const THREE_D: &str = "3D";
    pub const MOVIES: &str = "Movies";
    pub const TV_SHOWS: &str = "TV Shows";
    pub const SETS: &str = "Sets";
    pub const EXTRAS: &str = "Extras";

    pub const DEFAULT_ORDER: [&str; 16] = [
        ALL, NEW, NEW_MOVIE, NEW_TV, TOP250, RATING, WATCHED, UNWATCHED, HD, HD720, HD1080,
        THREE_D, MOVIES, TV_SHOWS, SETS, EXTRAS,
    ];
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a set master's rating is derived from its members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetsRating {
    #[default]
    Unset,
    First,
    Max,
    Average,
}

/// One category definition: enabled categories may be shown under a new name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Per-category sort override (`by` ∈ new, title, rating, top250, year).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SortOverride {
    pub by: Option<String>,
    pub ascending: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Dimensions to build, in output order.
    pub index_list: Vec<String>,
    pub category_min_count: usize,
    pub category_min_counts: HashMap<String, usize>,
    /// 0 means unlimited.
    pub category_max_count: usize,
    pub category_max_counts: HashMap<String, usize>,

    pub min_set_count: usize,
    pub sets_require_all: bool,
    pub sets_rating: SetsRating,
    pub single_series_page: bool,

    pub explode_set_categories: Vec<String>,
    pub explode_remove_master: bool,
    pub explode_keep_tv: bool,
    pub explode_before_sort: bool,
    pub remove_title_explode_set: bool,

    pub award_events: Vec<String>,
    pub award_names: Vec<String>,
    pub award_nominated: Vec<String>,
    pub award_won: Vec<String>,
    pub scrape_won_awards: bool,

    pub split_hd: bool,
    pub process_extras: bool,
    pub hide_watched: bool,
    pub watch_scanner_enabled: bool,

    pub filter_genres: bool,
    /// genre → master genre
    pub genre_map: HashMap<String, String>,
    pub max_genres_per_item: usize,

    pub filter_certification: bool,
    /// certification → master certification
    pub certification_map: HashMap<String, String>,
    pub default_certification: Option<String>,
    pub certification_ordering: Vec<String>,

    pub categories: Vec<CategoryDefinition>,

    pub char_group_english: bool,
    pub character_replacements: HashMap<String, String>,

    pub people_scan: bool,
    pub people_exclusive: bool,
    pub complete_person: bool,

    pub new_movie_days: i64,
    pub new_movie_count: usize,
    pub new_tv_days: i64,
    pub new_tv_count: usize,

    /// Keyed by lowercase category name without spaces (`tvshows`, `new-movie`).
    pub sort_overrides: HashMap<String, SortOverride>,
    pub sort_ignore_prefixes: Vec<String>,

    /// Worker permits for the parallel build phases.
    pub workers: usize,
}

fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_list: ["Other", "Genres", "Title", "Certification", "Year", "Library", "Set"]
                .into_iter()
                .map(String::from)
                .collect(),
            category_min_count: 3,
            category_min_counts: HashMap::new(),
            category_max_count: 0,
            category_max_counts: HashMap::new(),
            min_set_count: 2,
            sets_require_all: false,
            sets_rating: SetsRating::Unset,
            single_series_page: false,
            explode_set_categories: Vec::new(),
            explode_remove_master: false,
            explode_keep_tv: true,
            explode_before_sort: false,
            remove_title_explode_set: false,
            award_events: Vec::new(),
            award_names: Vec::new(),
            award_nominated: Vec::new(),
            award_won: Vec::new(),
            scrape_won_awards: false,
            split_hd: false,
            process_extras: true,
            hide_watched: true,
            watch_scanner_enabled: true,
            filter_genres: false,
            genre_map: HashMap::new(),
            max_genres_per_item: 3,
            filter_certification: false,
            certification_map: HashMap::new(),
            default_certification: None,
            certification_ordering: Vec::new(),
            categories: category::DEFAULT_ORDER
                .into_iter()
                .map(|name| CategoryDefinition {
                    name: name.to_string(),
                    rename: None,
                    enabled: true,
                })
                .collect(),
            char_group_english: false,
            character_replacements: HashMap::new(),
            people_scan: false,
            people_exclusive: false,
            complete_person: true,
            new_movie_days: 7,
            new_movie_count: 0,
            new_tv_days: 7,
            new_tv_count: 0,
            sort_overrides: HashMap::new(),
            sort_ignore_prefixes: Vec::new(),
            workers: 4,
        }
    }
}

impl IndexConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load the config file, falling back to the defaults (identity mappings)
    /// when it is absent or malformed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("no index config given, using defaults");
            return Self::default();
        };
        match Self::from_file(path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded index config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid index config, using defaults");
                Self::default()
            }
        }
    }

    /// Configured dimensions, unknown names skipped with a warning.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims = Vec::new();
        for name in &self.index_list {
            match Dimension::from_str(name) {
                Some(d) if !dims.contains(&d) => dims.push(d),
                Some(_) => {}
                None => warn!(index = %name, "unknown index name in index list"),
            }
        }
        dims
    }

    pub fn is_enabled(&self, dimension: Dimension) -> bool {
        self.index_list
            .iter()
            .any(|name| Dimension::from_str(name) == Some(dimension))
    }

    /// Display label of a canonical category, `None` when disabled.
    pub fn category_label(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.enabled && c.name == name)
            .map(|c| c.rename.as_deref().unwrap_or(&c.name))
    }

    /// Canonical category name for a (possibly renamed) label.
    pub fn original_category<'a>(&'a self, label: &'a str) -> &'a str {
        self.categories
            .iter()
            .filter(|c| c.enabled)
            .find(|c| c.rename.as_deref().unwrap_or(&c.name) == label)
            .map(|c| c.name.as_str())
            .unwrap_or(label)
    }

    /// Labels of all enabled categories in definition order.
    pub fn category_labels(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.rename.as_deref().unwrap_or(&c.name))
    }

    pub fn indexing_genre<'a>(&'a self, genre: &'a str) -> &'a str {
        if !self.filter_genres {
            return genre;
        }
        self.genre_map.get(genre).map(String::as_str).unwrap_or(genre)
    }

    pub fn indexing_certification<'a>(&'a self, certification: &'a str) -> &'a str {
        if !self.filter_certification {
            return certification;
        }
        if let Some(master) = self.certification_map.get(certification).filter(|m| !m.trim().is_empty()) {
            return master;
        }
        match self.default_certification.as_deref() {
            Some(default) if !default.is_empty() => default,
            _ => certification,
        }
    }

    /// Category cap for a dimension, `None` when unlimited.
    pub fn max_categories(&self, dimension: Dimension) -> Option<usize> {
        let max = self
            .category_max_counts
            .get(dimension.as_str())
            .copied()
            .unwrap_or(self.category_max_count);
        (max > 0).then_some(max)
    }

    pub fn min_category_count(&self, dimension: Dimension) -> usize {
        self.category_min_counts
            .get(dimension.as_str())
            .copied()
            .unwrap_or(self.category_min_count)
    }

    pub fn explodes(&self, category: &str) -> bool {
        self.explode_set_categories.iter().any(|c| c == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = IndexConfig::default();
        assert_eq!(c.min_set_count, 2);
        assert_eq!(c.max_genres_per_item, 3);
        assert_eq!(c.sets_rating, SetsRating::Unset);
        assert_eq!(
            c.dimensions(),
            vec![
                Dimension::Other,
                Dimension::Genres,
                Dimension::Title,
                Dimension::Certification,
                Dimension::Year,
                Dimension::Library,
                Dimension::Set,
            ]
        );
    }

    #[test]
    fn renamed_categories_resolve_both_ways() {
        let c = IndexConfig {
            categories: vec![
                CategoryDefinition {
                    name: "New".into(),
                    rename: Some("Recently Added".into()),
                    enabled: true,
                },
                CategoryDefinition {
                    name: "3D".into(),
                    rename: None,
                    enabled: false,
                },
            ],
            ..Default::default()
        };
        assert_eq!(c.category_label("New"), Some("Recently Added"));
        assert_eq!(c.original_category("Recently Added"), "New");
        assert_eq!(c.category_label("3D"), None);
        assert_eq!(c.original_category("Whatever"), "Whatever");
    }

    #[test]
    fn genre_mapping_only_when_filtering() {
        let mut c = IndexConfig::default();
        c.genre_map.insert("Sci-Fi".into(), "Science Fiction".into());
        assert_eq!(c.indexing_genre("Sci-Fi"), "Sci-Fi");
        c.filter_genres = true;
        assert_eq!(c.indexing_genre("Sci-Fi"), "Science Fiction");
        assert_eq!(c.indexing_genre("Drama"), "Drama");
    }

    #[test]
    fn certification_falls_back_to_default() {
        let mut c = IndexConfig {
            filter_certification: true,
            default_certification: Some("NR".into()),
            ..Default::default()
        };
        c.certification_map.insert("PG-13".into(), "Teen".into());
        assert_eq!(c.indexing_certification("PG-13"), "Teen");
        assert_eq!(c.indexing_certification("X"), "NR");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: IndexConfig =
            serde_json::from_str(r#"{ "min_set_count": 3, "sets_rating": "max" }"#).unwrap();
        assert_eq!(c.min_set_count, 3);
        assert_eq!(c.sets_rating, SetsRating::Max);
        assert_eq!(c.max_genres_per_item, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let c = IndexConfig::load_or_default(Some(Path::new("/nonexistent/jukebox.json")));
        assert_eq!(c.min_set_count, 2);
    }
}
