//! Parallel build coordinator.
//!
//! Runs the dimension builders and category sorts on a [`BoundedExecutor`],
//! and does every merge, master synthesis, compression and linking step on
//! the calling task so the result does not depend on worker scheduling.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use jukebox_core::config::category;
use jukebox_core::types::Department;
use jukebox_core::{Dimension, Entry, IndexConfig, Item, MasterItem, Person};
use jukebox_library::Library;
use tracing::{debug, info, warn};

use crate::category::CategoryIndex;
use crate::compress::{compress_index, explode_after_sort, CompressionPolicy};
use crate::dimension::{
    annotation_key, title_label, Annotations, BuildContext, DimensionBuilder, DimensionOutput,
    StandardBuilders,
};
use crate::executor::BoundedExecutor;
use crate::master::synthesize_masters;
use crate::navigation::{link, LinkedEntry};
use crate::phase::BuildPhase;
use crate::sort::{resolve, EntrySorter};
use crate::IndexError;

/// Everything one build reads.
#[derive(Debug, Clone)]
pub struct BuildInput {
    pub items: Vec<Arc<Item>>,
    pub people: Vec<Person>,
    pub library_ordering: Vec<String>,
    pub now: DateTime<Utc>,
}

impl BuildInput {
    pub fn from_library(library: &Library, now: DateTime<Utc>) -> Self {
        Self {
            items: library.snapshot(),
            people: library.people_snapshot(),
            library_ordering: library.library_ordering().to_vec(),
            now,
        }
    }
}

/// The finished, compressed and sorted indexes of one build.
#[derive(Debug, Clone)]
pub struct LibraryIndexes {
    built_at: DateTime<Utc>,
    indexes: Vec<CategoryIndex>,
    uncompressed: Vec<CategoryIndex>,
    masters: BTreeMap<String, Arc<MasterItem>>,
    items: Vec<LinkedEntry>,
    annotations: Annotations,
    person_annotations: Annotations,
    category_order: Vec<String>,
}

impl LibraryIndexes {
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Indexes in configured order; the set index comes last unless listed.
    pub fn indexes(&self) -> impl Iterator<Item = &CategoryIndex> {
        self.indexes.iter()
    }

    pub fn index(&self, dimension: Dimension) -> Option<&CategoryIndex> {
        self.indexes.iter().find(|i| i.dimension() == dimension)
    }

    pub fn uncompressed(&self, dimension: Dimension) -> Option<&CategoryIndex> {
        self.uncompressed.iter().find(|i| i.dimension() == dimension)
    }

    pub fn masters(&self) -> &BTreeMap<String, Arc<MasterItem>> {
        &self.masters
    }

    pub fn master(&self, set_name: &str) -> Option<&Arc<MasterItem>> {
        self.masters.get(set_name)
    }

    /// Navigation-linked entries: items and masters, then extras.
    pub fn items(&self) -> &[LinkedEntry] {
        &self.items
    }

    pub fn linked(&self, base_name: &str) -> Option<&LinkedEntry> {
        self.items.iter().find(|l| l.entry.base_name() == base_name)
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Person key → job → label, for people with enough entries.
    pub fn person_annotations(&self) -> &Annotations {
        &self.person_annotations
    }

    /// Entries in a category before compression; `None` when the dimension
    /// was not built.
    pub fn movie_count_for_index(&self, dimension: Dimension, category: &str) -> Option<usize> {
        let index = self
            .uncompressed(dimension)
            .or_else(|| self.index(dimension))?;
        Some(index.get(category).map_or(0, <[Entry]>::len))
    }

    /// The subset of `members` the uncompressed category holds, in `members` order.
    pub fn matching_items(&self, dimension: Dimension, members: &[Entry], category: &str) -> Vec<Entry> {
        let Some(list) = self
            .uncompressed(dimension)
            .or_else(|| self.index(dimension))
            .and_then(|index| index.get(category))
        else {
            return Vec::new();
        };
        let present: HashSet<usize> = list.iter().map(Entry::identity).collect();
        members
            .iter()
            .filter(|m| present.contains(&m.identity()))
            .cloned()
            .collect()
    }

    /// First non-empty category, in category definition order, of the first
    /// index that has one.
    pub fn default_category(&self) -> Option<&str> {
        self.indexes.iter().filter(|i| i.display()).find_map(|index| {
            self.category_order.iter().find_map(|label| {
                index
                    .get(label)
                    .filter(|list| !list.is_empty())
                    .map(|_| label.as_str())
            })
        })
    }

    /// Entries of the first index holding `label`.
    pub fn entries_by_category(&self, label: &str) -> Option<&[Entry]> {
        self.indexes.iter().find_map(|index| index.get(label))
    }
}

pub struct IndexCoordinator {
    config: Arc<IndexConfig>,
    builder: Arc<dyn DimensionBuilder>,
}

impl IndexCoordinator {
    pub fn new(config: Arc<IndexConfig>) -> Self {
        Self {
            config,
            builder: Arc::new(StandardBuilders),
        }
    }

    pub fn with_builder(mut self, builder: Arc<dyn DimensionBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn config(&self) -> &Arc<IndexConfig> {
        &self.config
    }

    fn advance(phase: &mut BuildPhase, to: BuildPhase) {
        debug_assert_eq!(phase.next(), Some(to));
        info!(from = %phase, to = %to, "build phase");
        *phase = to;
    }

    /// Run one full build. Any task failure aborts the build and no indexes
    /// are returned.
    pub async fn build(&self, input: BuildInput) -> Result<LibraryIndexes, IndexError> {
        let started = Instant::now();
        let config = self.config.clone();
        let mut phase = BuildPhase::Idle;

        let entries: Arc<[Entry]> = input.items.iter().cloned().map(Entry::Item).collect();
        let ctx = BuildContext {
            config: config.clone(),
            now: input.now,
            library_ordering: input.library_ordering.into(),
        };
        let configured = config.dimensions();
        let dimensions: Vec<Dimension> = configured
            .iter()
            .copied()
            .filter(|d| *d != Dimension::Set)
            .collect();

        // Build: the set index first, then every configured dimension.
        Self::advance(&mut phase, BuildPhase::Building);
        let mut executor = BoundedExecutor::new("build", config.workers);
        for dimension in std::iter::once(Dimension::Set).chain(dimensions.iter().copied()) {
            let builder = self.builder.clone();
            let entries = entries.clone();
            let ctx = ctx.clone();
            executor.submit(format!("index {dimension}"), move || {
                builder
                    .build(dimension, &entries, &ctx)
                    .map(|output| (dimension, output))
            });
        }
        let mut built: HashMap<Dimension, DimensionOutput> =
            executor.join_all().await?.into_iter().collect();
        Self::advance(&mut phase, BuildPhase::BuildJoined);

        let mut annotations = Annotations::default();
        let Some(set_output) = built.remove(&Dimension::Set) else {
            return Err(IndexError::TaskFailed {
                task: "index Set".into(),
                message: "no output".into(),
            });
        };
        let set_index = set_output.index;
        annotations.extend(set_output.annotations);

        let mut indexes = Vec::with_capacity(dimensions.len() + 1);
        for dimension in &dimensions {
            let Some(output) = built.remove(dimension) else {
                return Err(IndexError::TaskFailed {
                    task: format!("index {dimension}"),
                    message: "no output".into(),
                });
            };
            annotations.extend(output.annotations);
            indexes.push(output.index);
        }
        let uncompressed = indexes.clone();

        Self::advance(&mut phase, BuildPhase::MasterSynthesis);
        let masters = synthesize_masters(&set_index, &config)?;
        info!(sets = masters.len(), "set masters synthesized");

        Self::advance(&mut phase, BuildPhase::Compressing);
        for index in &mut indexes {
            compress_index(index, &set_index, &masters, &config);
        }
        if config.is_enabled(Dimension::Title) && !config.remove_title_explode_set {
            if let Some(title) = indexes.iter_mut().find(|i| i.dimension() == Dimension::Title) {
                for master in masters.values() {
                    if master.set_size() < config.min_set_count {
                        continue;
                    }
                    let entry = Entry::Master(master.clone());
                    if let Some(label) = title_label(&entry, &config) {
                        title.add(&label, entry);
                    }
                }
            }
        }
        annotate_masters(&mut annotations, &indexes, &config);

        // The set index is sorted and published with the rest, but never compressed.
        let set_position = configured
            .iter()
            .position(|d| *d == Dimension::Set)
            .unwrap_or(indexes.len());
        indexes.insert(set_position, set_index);

        Self::advance(&mut phase, BuildPhase::Sorting);
        let sorter = Arc::new(EntrySorter::new(&config));
        let mut executor = BoundedExecutor::new("sort", config.workers);
        for (slot, index) in indexes.iter_mut().enumerate() {
            let dimension = index.dimension();
            for (position, (label, list)) in index.iter_mut().enumerate() {
                let order = resolve(&config, dimension, label);
                let mut list = std::mem::take(list);
                let sorter = sorter.clone();
                executor.submit(format!("sort {dimension}/{label}"), move || {
                    sorter.sort(&order, &mut list);
                    Ok((slot, position, list))
                });
            }
        }
        for (slot, position, list) in executor.join_all().await? {
            if let Some(target) = indexes
                .get_mut(slot)
                .and_then(|index| index.iter_mut().nth(position))
            {
                *target.1 = list;
            }
        }
        Self::advance(&mut phase, BuildPhase::SortJoined);

        // Caps count compressed entries, so trimming comes before exploding.
        trim_new_categories(&mut indexes, &config);
        if !config.explode_before_sort {
            explode_sorted(&mut indexes, &uncompressed, &config, &sorter);
        }
        merge_new_categories(&mut indexes, &config);

        Self::advance(&mut phase, BuildPhase::Linking);
        let mut all: Vec<Entry> = entries.to_vec();
        all.extend(masters.values().cloned().map(Entry::Master));
        all.sort_by(|a, b| sorter.natural(a, b));
        let items = link(all);

        let mut built_indexes = LibraryIndexes {
            built_at: input.now,
            indexes,
            uncompressed,
            masters,
            items,
            annotations,
            person_annotations: Annotations::default(),
            category_order: config.category_labels().map(str::to_string).collect(),
        };
        built_indexes.person_annotations = annotate_people(&built_indexes, &input.people, &config);

        Self::advance(&mut phase, BuildPhase::Done);
        info!(
            items = input.items.len(),
            masters = built_indexes.masters.len(),
            indexes = built_indexes.indexes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index build complete"
        );
        Ok(built_indexes)
    }
}

/// Record where each master ended up after compression.
fn annotate_masters(annotations: &mut Annotations, indexes: &[CategoryIndex], config: &IndexConfig) {
    for index in indexes {
        let dimension = index.dimension();
        for (label, list) in index.iter() {
            let key = if dimension == Dimension::Other {
                annotation_key_for_other(config, label)
            } else {
                annotation_key(dimension)
            };
            for master in list.iter().filter(|e| e.is_master()) {
                annotations.add(master.base_name(), key, label);
            }
        }
    }
}

fn annotation_key_for_other<'a>(config: &'a IndexConfig, label: &'a str) -> &'a str {
    match config.original_category(label) {
        category::HD1080 | category::HD720 => category::HD,
        canonical => canonical,
    }
}

fn explode_sorted(
    indexes: &mut [CategoryIndex],
    uncompressed: &[CategoryIndex],
    config: &IndexConfig,
    sorter: &EntrySorter,
) {
    for index in indexes.iter_mut() {
        let dimension = index.dimension();
        if dimension == Dimension::Set {
            continue;
        }
        let source = uncompressed.iter().find(|i| i.dimension() == dimension);
        for (label, list) in index.iter_mut() {
            let policy = CompressionPolicy::resolve(config, dimension, label);
            if policy == CompressionPolicy::Compress {
                continue;
            }
            let original = source.and_then(|s| s.get(label)).unwrap_or(&[]);
            explode_after_sort(list, original, policy, |set, members| {
                members.sort_by(|a, b| sorter.compare_in_set(set, a, b));
            });
        }
    }
}

/// Keep the `new_movie_count` / `new_tv_count` most recent entries.
fn trim_new_categories(indexes: &mut [CategoryIndex], config: &IndexConfig) {
    if config.new_movie_count == 0 && config.new_tv_count == 0 {
        return;
    }
    let Some(other) = indexes.iter_mut().find(|i| i.dimension() == Dimension::Other) else {
        warn!("the Other index must be enabled to trim the New categories");
        return;
    };
    for (canonical, count) in [
        (category::NEW_MOVIE, config.new_movie_count),
        (category::NEW_TV, config.new_tv_count),
    ] {
        if count == 0 {
            continue;
        }
        if let Some(list) = config.category_label(canonical).and_then(|l| other.get_mut(l)) {
            list.truncate(count);
        }
    }
}

/// Merge New-Movie and New-TV into New, most recent first. A master filed
/// in both appears once.
fn merge_new_categories(indexes: &mut [CategoryIndex], config: &IndexConfig) {
    let Some(other) = indexes.iter_mut().find(|i| i.dimension() == Dimension::Other) else {
        return;
    };
    let Some(new_label) = config.category_label(category::NEW) else {
        return;
    };
    let mut seen = HashSet::new();
    let mut merged: Vec<Entry> = Vec::new();
    for canonical in [category::NEW_MOVIE, category::NEW_TV] {
        if let Some(list) = config.category_label(canonical).and_then(|l| other.get(l)) {
            merged.extend(list.iter().filter(|e| seen.insert(e.identity())).cloned());
        }
    }
    if merged.is_empty() {
        return;
    }
    merged.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
    debug!(entries = merged.len(), label = new_label, "new category");
    other.set(new_label, merged);
}

/// Jobs for people with an external id whose category is big enough.
fn annotate_people(indexes: &LibraryIndexes, people: &[Person], config: &IndexConfig) -> Annotations {
    let jobs = [
        (Dimension::Cast, Some(Department::Actors)),
        (Dimension::Director, Some(Department::Directing)),
        (Dimension::Writer, Some(Department::Writing)),
        (Dimension::Person, None),
    ];
    let mut annotations = Annotations::default();
    for (dimension, department) in jobs {
        if !config.is_enabled(dimension) {
            continue;
        }
        info!("indexing {dimension} (person)");
        let min = config.min_category_count(dimension);
        for person in people.iter().filter(|p| p.is_complete()) {
            if department.is_some_and(|d| !person.departments.contains(&d)) {
                continue;
            }
            let count = indexes
                .movie_count_for_index(dimension, &person.name)
                .unwrap_or(0);
            if count >= min {
                annotations.add(&person.key(), dimension.as_str(), &person.name);
            }
        }
    }
    annotations
}
