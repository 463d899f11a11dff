//! Per-dimension bucket builders.
//!
//! Every builder reads the shared entry list and returns its own
//! [`DimensionOutput`]; nothing here touches shared mutable state, so the
//! coordinator can run them on any worker.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use jukebox_core::config::category;
use jukebox_core::entry::strip_sort_prefix;
use jukebox_core::types::{Department, UNKNOWN};
use jukebox_core::{Dimension, Entry, IndexConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::category::{CategoryIndex, LabelOrder};
use crate::IndexError;

/// Immutable inputs shared by every builder of one build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: Arc<IndexConfig>,
    pub now: DateTime<Utc>,
    /// Library descriptions in discovery order.
    pub library_ordering: Arc<[String]>,
}

/// Which labels each entry was filed under, by base name then annotation key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl Annotations {
    pub fn add(&mut self, owner: &str, key: &str, label: &str) {
        let labels = self
            .0
            .entry(owner.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }

    pub fn extend(&mut self, other: Annotations) {
        for (owner, keys) in other.0 {
            for (key, labels) in keys {
                for label in labels {
                    self.add(&owner, &key, &label);
                }
            }
        }
    }

    pub fn get(&self, owner: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.0.get(owner)
    }

    pub fn labels(&self, owner: &str, key: &str) -> &[String] {
        self.0
            .get(owner)
            .and_then(|keys| keys.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DimensionOutput {
    pub index: CategoryIndex,
    pub annotations: Annotations,
}

impl DimensionOutput {
    pub fn new(index: CategoryIndex) -> Self {
        Self {
            index,
            annotations: Annotations::default(),
        }
    }

    /// File an entry and record the annotation when it actually landed.
    fn file(&mut self, key: &str, label: &str, entry: &Entry) {
        if self.index.add(label, entry.clone()) {
            self.annotations.add(entry.base_name(), key, label);
        }
    }
}

/// Seam for producing one dimension's index.
pub trait DimensionBuilder: Send + Sync {
    fn build(
        &self,
        dimension: Dimension,
        entries: &[Entry],
        ctx: &BuildContext,
    ) -> Result<DimensionOutput, IndexError>;
}

/// The builders every jukebox build uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBuilders;

impl DimensionBuilder for StandardBuilders {
    fn build(
        &self,
        dimension: Dimension,
        entries: &[Entry],
        ctx: &BuildContext,
    ) -> Result<DimensionOutput, IndexError> {
        Ok(build_dimension(dimension, entries, ctx))
    }
}

/// Annotation key an entry records for a dimension.
pub fn annotation_key(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Cast => "Actor",
        other => other.as_str(),
    }
}

/// Empty index shaped for `dimension`: label order, cap and visibility.
pub fn new_index(dimension: Dimension, ctx: &BuildContext) -> CategoryIndex {
    let config = &ctx.config;
    let index = CategoryIndex::new(dimension);
    match dimension {
        Dimension::Certification if !config.certification_ordering.is_empty() => {
            index.with_order(LabelOrder::Ranked(config.certification_ordering.clone()))
        }
        Dimension::Library => index.with_order(LabelOrder::Ranked(ctx.library_ordering.to_vec())),
        Dimension::Set => index.hidden(),
        Dimension::Cast
        | Dimension::Director
        | Dimension::Writer
        | Dimension::Country
        | Dimension::Award
        | Dimension::Person
        | Dimension::Ratings => index.with_max_categories(config.max_categories(dimension)),
        _ => index,
    }
}

pub fn build_dimension(dimension: Dimension, entries: &[Entry], ctx: &BuildContext) -> DimensionOutput {
    info!("indexing {dimension}");
    let mut out = DimensionOutput::new(new_index(dimension, ctx));
    let config = &ctx.config;
    let now_year = ctx.now.year();

    for entry in entries {
        if dimension == Dimension::Other {
            index_properties(&mut out, entry, ctx);
            continue;
        }
        if entry.is_extra() {
            continue;
        }
        match dimension {
            Dimension::Other => {}
            Dimension::Title => {
                if let Some(label) = title_label(entry, config) {
                    out.file(annotation_key(dimension), &label, entry);
                }
            }
            Dimension::Year => {
                let label = year_label(entry.year(), now_year);
                out.file(annotation_key(dimension), &label, entry);
            }
            Dimension::Genres => {
                // The cap counts source genres, mapped or not.
                for genre in entry.genres().iter().take(config.max_genres_per_item) {
                    out.file(annotation_key(dimension), config.indexing_genre(genre), entry);
                }
            }
            Dimension::Certification => {
                let certification = entry
                    .certification()
                    .filter(|c| !c.is_empty())
                    .unwrap_or(UNKNOWN);
                out.file(
                    annotation_key(dimension),
                    config.indexing_certification(certification),
                    entry,
                );
            }
            Dimension::Library => {
                let description = entry.library_description();
                if !description.is_empty() {
                    out.file(annotation_key(dimension), description, entry);
                }
            }
            Dimension::Cast => index_people(&mut out, entry, config, dimension, entry.cast(), Department::Actors),
            Dimension::Director => index_people(&mut out, entry, config, dimension, entry.directors(), Department::Directing),
            Dimension::Writer => index_people(&mut out, entry, config, dimension, entry.writers(), Department::Writing),
            Dimension::Person => {
                for credit in entry.credits() {
                    if config.complete_person && !has_id(&credit.external_id) {
                        continue;
                    }
                    out.file(annotation_key(dimension), &credit.name, entry);
                }
            }
            Dimension::Country => {
                for country in entry.countries() {
                    out.file(annotation_key(dimension), country, entry);
                }
            }
            Dimension::Award => {
                for event in entry.awards() {
                    if award_event_matches(event, config) {
                        out.file(annotation_key(dimension), &event.name, entry);
                    }
                }
            }
            Dimension::Ratings => {
                if let Some(label) = entry.rating().and_then(rating_label) {
                    out.file(annotation_key(dimension), &label, entry);
                }
            }
            Dimension::Set => {
                if config.single_series_page && entry.is_tv() {
                    out.file(annotation_key(dimension), entry.original_title(), entry);
                }
                for set in entry.sets() {
                    out.file(annotation_key(dimension), &set.name, entry);
                }
            }
        }
    }

    debug!(
        dimension = %dimension,
        categories = out.index.len(),
        entries = out.index.entry_count(),
        "dimension built"
    );
    out
}

fn has_id(id: &Option<String>) -> bool {
    id.as_deref().is_some_and(|id| !id.is_empty() && id != UNKNOWN)
}

/// People mode reads department credits instead of the flat name lists.
fn index_people(
    out: &mut DimensionOutput,
    entry: &Entry,
    config: &IndexConfig,
    dimension: Dimension,
    names: &[String],
    department: Department,
) {
    let key = annotation_key(dimension);
    if config.people_scan && config.people_exclusive {
        for credit in entry.credits() {
            if credit.department != department {
                continue;
            }
            if config.complete_person && !has_id(&credit.external_id) {
                continue;
            }
            out.file(key, &credit.name, entry);
        }
    } else {
        for name in names {
            out.file(key, name, entry);
        }
    }
}

/// Title letter: uppercased first character of the stripped sort title.
pub fn title_label(entry: &Entry, config: &IndexConfig) -> Option<String> {
    let title = strip_sort_prefix(entry.sort_title(), &config.sort_ignore_prefixes).trim_start();
    let first = title.chars().next()?;
    let upper = first.to_uppercase().next().unwrap_or(first);
    if !upper.is_alphabetic() {
        return Some("09".to_string());
    }
    if config.char_group_english && upper.is_ascii_alphabetic() {
        return Some("AZ".to_string());
    }
    let letter = upper.to_string();
    Some(
        config
            .character_replacements
            .get(&letter)
            .cloned()
            .unwrap_or(letter),
    )
}

/// Year bucket relative to `now_year`.
///
/// The decade in progress ends two years before now, so it never claims
/// years that cannot have finished yet.
pub fn year_label(year: Option<&str>, now_year: i32) -> String {
    let Some(year) = year
        .map(str::trim)
        .filter(|y| !y.is_empty() && y.chars().all(|c| c.is_ascii_digit()))
        .and_then(|y| y.parse::<i32>().ok())
    else {
        return UNKNOWN.to_string();
    };

    if year == now_year {
        return "This Year".to_string();
    }
    if year == now_year - 1 {
        return "Last Year".to_string();
    }

    let final_year = now_year - 2;
    let current_decade = final_year / 10 * 10;
    let decade = year / 10 * 10;
    let end = if year >= current_decade {
        final_year
    } else {
        decade + 9
    };
    format!("{decade}-{:02}", end % 100)
}

pub fn rating_label(rating: i32) -> Option<String> {
    if rating <= 0 {
        return None;
    }
    let band = rating / 10;
    Some(format!("{band}.0-{band}.9"))
}

/// An event is filed once, as soon as one of its awards passes the name
/// filter and the won/nominated rule.
pub fn award_event_matches(event: &jukebox_core::types::AwardEvent, config: &IndexConfig) -> bool {
    if !config.award_events.is_empty() && !config.award_events.contains(&event.name) {
        return false;
    }
    event.awards.iter().any(|award| {
        if !config.award_names.is_empty() && !config.award_names.contains(&award.name) {
            return false;
        }
        let won_ok = !award.won.is_empty()
            && (config.award_won.is_empty() || award.won.iter().any(|w| config.award_won.contains(w)));
        let nominated_ok = !config.scrape_won_awards
            && !award.nominated.is_empty()
            && if config.award_nominated.is_empty() {
                config.award_won.is_empty()
            } else {
                award
                    .nominated
                    .iter()
                    .any(|n| config.award_nominated.contains(n))
            };
        won_ok || nominated_ok
    })
}

fn is_new(entry: &Entry, days: i64, now: DateTime<Utc>) -> bool {
    days > 0
        && entry
            .last_modified()
            .is_some_and(|modified| now.signed_duration_since(modified) <= Duration::days(days))
}

/// The "Other" dimension: independent property categories per entry.
fn index_properties(out: &mut DimensionOutput, entry: &Entry, ctx: &BuildContext) {
    let config = &ctx.config;
    let file = |out: &mut DimensionOutput, key: &str, canonical: &str| {
        if let Some(label) = config.category_label(canonical) {
            out.file(key, label, entry);
        }
    };

    if entry.is_extra() {
        if config.process_extras {
            file(out, category::EXTRAS, category::EXTRAS);
        }
        return;
    }

    let definition = entry.definition();
    if definition.is_hd() {
        let canonical = match (config.split_hd, definition.is_hd1080()) {
            (false, _) => category::HD,
            (true, true) => category::HD1080,
            (true, false) => category::HD720,
        };
        file(out, category::HD, canonical);
    }
    if entry.is_3d() {
        file(out, category::THREE_D, category::THREE_D);
    }
    if entry.top250().is_some_and(|rank| rank > 0) {
        file(out, category::TOP250, category::TOP250);
    }
    if entry.rating().is_some_and(|rating| rating > 0) {
        file(out, category::RATING, category::RATING);
    }
    if config.watch_scanner_enabled {
        if entry.watched() {
            file(out, category::WATCHED, category::WATCHED);
        } else {
            file(out, category::UNWATCHED, category::UNWATCHED);
        }
    }

    let hidden_as_watched = entry.watched() && config.hide_watched && config.watch_scanner_enabled;
    let tv = entry.is_tv();
    if !tv && !hidden_as_watched && is_new(entry, config.new_movie_days, ctx.now) {
        file(out, category::NEW_MOVIE, category::NEW_MOVIE);
    }
    if tv && !hidden_as_watched && is_new(entry, config.new_tv_days, ctx.now) {
        file(out, category::NEW_TV, category::NEW_TV);
    }

    file(out, category::ALL, category::ALL);
    if tv {
        file(out, category::TV_SHOWS, category::TV_SHOWS);
    } else {
        file(out, category::MOVIES, category::MOVIES);
    }
    if !tv && !entry.sets().is_empty() {
        file(out, category::SETS, category::SETS);
    }
}
