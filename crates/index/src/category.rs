//! Label → entry-list buckets for one dimension.

use std::cmp::Ordering;

use jukebox_core::{Dimension, Entry};
use tracing::trace;

/// How category labels are ordered inside an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LabelOrder {
    #[default]
    Lexical,
    /// Position in the list wins; unlisted labels follow in lexical order.
    Ranked(Vec<String>),
}

impl LabelOrder {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Lexical => a.cmp(b),
            Self::Ranked(ranking) => {
                let rank = |label: &str| {
                    ranking
                        .iter()
                        .position(|r| r == label)
                        .unwrap_or(usize::MAX)
                };
                rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
            }
        }
    }
}

/// Ordered mapping of category label to the entries filed under it.
///
/// Entry lists keep discovery order until the sort phase rewrites them. An
/// entry is held at most once per category.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    dimension: Dimension,
    order: LabelOrder,
    max_categories: Option<usize>,
    display: bool,
    categories: Vec<(String, Vec<Entry>)>,
}

impl CategoryIndex {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            order: LabelOrder::Lexical,
            max_categories: None,
            display: true,
            categories: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: LabelOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_max_categories(mut self, max: Option<usize>) -> Self {
        self.max_categories = max;
        self
    }

    /// Built for internal use only (the set index), never displayed.
    pub fn hidden(mut self) -> Self {
        self.display = false;
        self
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn display(&self) -> bool {
        self.display
    }

    pub fn max_categories(&self) -> Option<usize> {
        self.max_categories
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total entries over all categories (an entry in two categories counts twice).
    pub fn entry_count(&self) -> usize {
        self.categories.iter().map(|(_, list)| list.len()).sum()
    }

    fn position(&self, label: &str) -> Result<usize, usize> {
        self.categories
            .binary_search_by(|(existing, _)| self.order.compare(existing, label))
    }

    /// File `entry` under `label`.
    ///
    /// Returns `false` when the entry is already in that category, or when the
    /// label is new and the category cap has been reached.
    pub fn add(&mut self, label: &str, entry: Entry) -> bool {
        match self.position(label) {
            Ok(pos) => {
                let list = &mut self.categories[pos].1;
                if list.iter().any(|e| e.same(&entry)) {
                    return false;
                }
                list.push(entry);
                true
            }
            Err(pos) => {
                if self
                    .max_categories
                    .is_some_and(|max| self.categories.len() >= max)
                {
                    trace!(dimension = %self.dimension, label, "category cap reached");
                    return false;
                }
                self.categories.insert(pos, (label.to_string(), vec![entry]));
                true
            }
        }
    }

    /// Replace (or create) a whole category, bypassing the cap.
    pub fn set(&mut self, label: &str, entries: Vec<Entry>) {
        match self.position(label) {
            Ok(pos) => self.categories[pos].1 = entries,
            Err(pos) => self.categories.insert(pos, (label.to_string(), entries)),
        }
    }

    pub fn remove(&mut self, label: &str) -> Option<Vec<Entry>> {
        let pos = self.position(label).ok()?;
        Some(self.categories.remove(pos).1)
    }

    pub fn get(&self, label: &str) -> Option<&[Entry]> {
        let pos = self.position(label).ok()?;
        Some(&self.categories[pos].1)
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Vec<Entry>> {
        let pos = self.position(label).ok()?;
        Some(&mut self.categories[pos].1)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_ok()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Entry])> {
        self.categories
            .iter()
            .map(|(label, list)| (label.as_str(), list.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<Entry>)> {
        self.categories
            .iter_mut()
            .map(|(label, list)| (label.as_str(), list))
    }

    /// Drop categories left without entries.
    pub fn prune_empty(&mut self) {
        self.categories.retain(|(_, list)| !list.is_empty());
    }
}
