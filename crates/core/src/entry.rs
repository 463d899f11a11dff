//! Index entries: a real scraped item or a synthetic set master.
//!
//! Category indexes only ever hold [`Entry`] values. Keeping the master as its
//! own variant means nothing downstream can mistake it for scraped data.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{
    AwardEvent, Credit, Definition, DirtyFlag, Item, ItemKind, MediaFile, SetMembership, UNKNOWN,
};

/// Synthetic summary of every member of one set.
#[derive(Debug, Clone)]
pub struct MasterItem {
    pub set_name: String,
    pub title_sort: String,
    pub base_name: String,
    /// Member whose display fields the master borrows.
    pub representative: Arc<Item>,
    pub members: Vec<Arc<Item>>,
    pub kind: ItemKind,
    pub tv_count: usize,
    pub hd_count: usize,
    pub definition: Definition,
    pub watched: bool,
    pub top250: Option<u32>,
    /// Key of the member that contributed `top250`.
    pub top250_source: Option<String>,
    pub rating: Option<i32>,
    pub file_date: Option<DateTime<Utc>>,
    pub dirty: BTreeSet<DirtyFlag>,
    pub files: Vec<MediaFile>,
    pub poster: String,
}

impl MasterItem {
    pub fn set_size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, item: &Arc<Item>) -> bool {
        self.members.iter().any(|m| Arc::ptr_eq(m, item))
    }
}

#[derive(Debug, Clone)]
pub enum Entry {
    Item(Arc<Item>),
    Master(Arc<MasterItem>),
}

impl From<Item> for Entry {
    fn from(item: Item) -> Self {
        Self::Item(Arc::new(item))
    }
}

impl From<Arc<Item>> for Entry {
    fn from(item: Arc<Item>) -> Self {
        Self::Item(item)
    }
}

impl From<MasterItem> for Entry {
    fn from(master: MasterItem) -> Self {
        Self::Master(Arc::new(master))
    }
}

impl Entry {
    /// Identity comparison; two clones of the same entry are the same.
    pub fn same(&self, other: &Entry) -> bool {
        match (self, other) {
            (Self::Item(a), Self::Item(b)) => Arc::ptr_eq(a, b),
            (Self::Master(a), Self::Master(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address of the shared allocation, usable as a hash key for [`Entry::same`].
    pub fn identity(&self) -> usize {
        match self {
            Self::Item(item) => Arc::as_ptr(item) as usize,
            Self::Master(master) => Arc::as_ptr(master) as usize,
        }
    }

    pub fn as_item(&self) -> Option<&Arc<Item>> {
        match self {
            Self::Item(item) => Some(item),
            Self::Master(_) => None,
        }
    }

    pub fn as_master(&self) -> Option<&Arc<MasterItem>> {
        match self {
            Self::Item(_) => None,
            Self::Master(master) => Some(master),
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master(_))
    }

    pub fn is_extra(&self) -> bool {
        match self {
            Self::Item(item) => item.extra,
            Self::Master(_) => false,
        }
    }

    /// The item whose descriptive fields this entry shows.
    fn display(&self) -> &Item {
        match self {
            Self::Item(item) => item,
            Self::Master(master) => &master.representative,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Item(item) => &item.title,
            Self::Master(master) => &master.set_name,
        }
    }

    pub fn sort_title(&self) -> &str {
        match self {
            Self::Item(item) => item.sort_title(),
            Self::Master(master) => &master.title_sort,
        }
    }

    pub fn original_title(&self) -> &str {
        match self {
            Self::Item(item) => item.original_title(),
            Self::Master(master) => &master.set_name,
        }
    }

    pub fn base_name(&self) -> &str {
        match self {
            Self::Item(item) => &item.base_name,
            Self::Master(master) => &master.base_name,
        }
    }

    pub fn year(&self) -> Option<&str> {
        self.display().year.as_deref()
    }

    pub fn season(&self) -> Option<u32> {
        self.display().season
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        self.display().release_date
    }

    pub fn is_tv(&self) -> bool {
        match self {
            Self::Item(item) => item.is_tv(),
            Self::Master(master) => master.kind == ItemKind::TvShow,
        }
    }

    pub fn definition(&self) -> Definition {
        match self {
            Self::Item(item) => item.definition,
            Self::Master(master) => master.definition,
        }
    }

    pub fn is_3d(&self) -> bool {
        self.display().three_d
    }

    pub fn watched(&self) -> bool {
        match self {
            Self::Item(item) => item.watched,
            Self::Master(master) => master.watched,
        }
    }

    pub fn top250(&self) -> Option<u32> {
        match self {
            Self::Item(item) => item.top250,
            Self::Master(master) => master.top250,
        }
    }

    pub fn rating(&self) -> Option<i32> {
        match self {
            Self::Item(item) => item.rating(),
            Self::Master(master) => master.rating,
        }
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Item(item) => item.last_modified(),
            Self::Master(master) => master.file_date,
        }
    }

    /// Set memberships; masters never belong to a set themselves.
    pub fn sets(&self) -> &[SetMembership] {
        match self {
            Self::Item(item) => &item.sets,
            Self::Master(_) => &[],
        }
    }

    pub fn set_order(&self, set: &str) -> Option<i32> {
        self.as_item().and_then(|item| item.set_order(set))
    }

    pub fn genres(&self) -> &[String] {
        &self.display().genres
    }

    pub fn cast(&self) -> &[String] {
        &self.display().cast
    }

    pub fn directors(&self) -> &[String] {
        &self.display().directors
    }

    pub fn writers(&self) -> &[String] {
        &self.display().writers
    }

    pub fn countries(&self) -> &[String] {
        &self.display().countries
    }

    pub fn credits(&self) -> &[Credit] {
        &self.display().credits
    }

    pub fn certification(&self) -> Option<&str> {
        self.display().certification.as_deref()
    }

    pub fn library_description(&self) -> &str {
        &self.display().library_description
    }

    pub fn awards(&self) -> &[AwardEvent] {
        &self.display().awards
    }

    /// Lowercased sort title with ignore-prefixes removed, followed by the
    /// padded season and the year so remakes and seasons sort apart.
    pub fn stripped_title_sort(&self, ignore_prefixes: &[String]) -> String {
        let mut text = strip_sort_prefix(self.sort_title(), ignore_prefixes).to_string();
        if let Some(season) = self.season() {
            text.push_str(&format!(" {season:02}"));
        }
        text.push_str(&format!(" ({}) ", self.year().unwrap_or(UNKNOWN)));
        text.to_lowercase()
    }
}

/// Remove the first matching prefix (case-insensitive) from a sort title.
pub fn strip_sort_prefix<'a>(title: &'a str, ignore_prefixes: &[String]) -> &'a str {
    let lower = title.to_lowercase();
    for prefix in ignore_prefixes {
        if prefix.is_empty() {
            continue;
        }
        if lower.starts_with(&prefix.to_lowercase()) {
            if let Some(rest) = title.get(prefix.len()..) {
                return rest;
            }
        }
    }
    title
}
