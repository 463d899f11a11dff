use std::collections::BTreeMap;
use std::sync::Arc;

use jukebox_core::types::ExtraFile;
use jukebox_core::{Item, Person};
use serde::Serialize;
use tracing::{debug, trace};

/// What happened to an item handed to [`Library::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    /// First item under its key.
    Inserted,
    /// Files merged into the existing item.
    Merged,
    /// The incoming item became the primary and inherited the existing files.
    Replaced,
    /// Filed in the extras side table.
    Extra,
}

/// Canonical item set keyed by derived key, plus extras and people.
#[derive(Debug, Default)]
pub struct Library {
    items: BTreeMap<String, Item>,
    extras: BTreeMap<String, Item>,
    people: BTreeMap<String, Person>,
    library_ordering: Vec<String>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn items(&self) -> impl Iterator<Item = (&String, &Item)> {
        self.items.iter()
    }

    pub fn extras(&self) -> impl Iterator<Item = &Item> {
        self.extras.values()
    }

    /// Library descriptions in the order they were first seen.
    pub fn library_ordering(&self) -> &[String] {
        &self.library_ordering
    }

    /// File an item under its derived key, merging with an existing one.
    pub fn add_item(&mut self, item: Item) -> AddOutcome {
        if item.extra {
            debug!(base_name = %item.base_name, "filing extra");
            self.extras.insert(item.base_name.clone(), item);
            return AddOutcome::Extra;
        }

        let key = item.key();
        let Some(existing) = self.items.get_mut(&key) else {
            if !item.library_description.is_empty()
                && !self.library_ordering.contains(&item.library_description)
            {
                self.library_ordering.push(item.library_description.clone());
            }
            trace!(key = %key, "adding item");
            self.items.insert(key, item);
            return AddOutcome::Inserted;
        };

        if existing.is_tv() || existing.files.len() > 1 {
            // The lowest episode has to be the primary item.
            let incoming_first = item.first_part().unwrap_or(u32::MAX);
            let existing_first = existing.first_part().unwrap_or(u32::MAX);
            if incoming_first < existing_first {
                let mut primary = item;
                for file in existing.files.drain(..) {
                    primary.add_file(file);
                }
                primary.add_file_date(existing.file_date);
                debug!(key = %key, episode = incoming_first, "lower episode becomes primary");
                *existing = primary;
                return AddOutcome::Replaced;
            }
        }

        let file_date = item.last_modified();
        for file in item.files {
            existing.add_file(file);
        }
        existing.add_file_date(file_date);
        AddOutcome::Merged
    }

    /// Fold extras into the library: each extra is listed under its base name
    /// and its parent (by derived key) records the extra file.
    pub fn merge_extras(&mut self) {
        for (base_name, extra) in &self.extras {
            if let Some(parent) = self.items.get_mut(&extra.key()) {
                if let Some(file) = extra.files.first() {
                    if !parent.extra_files.iter().any(|e| e.filename == file.filename) {
                        parent.extra_files.push(ExtraFile {
                            filename: file.filename.clone(),
                            title: extra.title.clone(),
                            new_file: true,
                        });
                    }
                }
            }
            self.items
                .entry(base_name.clone())
                .or_insert_with(|| extra.clone());
        }
    }

    /// Immutable copy of every item, in key order, for an index build.
    pub fn snapshot(&self) -> Vec<Arc<Item>> {
        self.items.values().cloned().map(Arc::new).collect()
    }

    /// Add a person unless one with the same key already exists.
    pub fn add_person(&mut self, person: Person) {
        self.people.entry(person.key()).or_insert(person);
    }

    pub fn person(&self, key: &str) -> Option<&Person> {
        self.people.get(key)
    }

    pub fn person_by_name(&self, name: &str) -> Option<&Person> {
        self.people
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    pub fn people_snapshot(&self) -> Vec<Person> {
        self.people.values().cloned().collect()
    }

    /// Drop every item, extra and person; the next build starts from scratch.
    pub fn clear(&mut self) {
        self.items.clear();
        self.extras.clear();
        self.people.clear();
        self.library_ordering.clear();
    }
}
