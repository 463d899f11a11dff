//! Category sort resolution and the entry comparators.

use std::cmp::Ordering;

use jukebox_core::config::category;
use jukebox_core::{Dimension, Entry, IndexConfig};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    New,
    Title,
    Rating,
    Top250,
    Year,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Title => "title",
            Self::Rating => "rating",
            Self::Top250 => "top250",
            Self::Year => "year",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Self::New),
            "title" => Some(Self::Title),
            "rating" => Some(Self::Rating),
            "top250" => Some(Self::Top250),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

/// How one category list gets ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    /// Stripped sort title, case-insensitive.
    Natural,
    By { key: SortKey, ascending: bool },
    /// Members of the named set: ordinal, then year, then sort title.
    Set(String),
}

/// Documented default for a canonical category name.
pub fn default_sort(name: &str) -> Option<(SortKey, bool)> {
    let sort = match name {
        "Person" | "Cast" | "Director" | "Writer" | "Genres" | "Title" | "Certification"
        | "Year" | "Library" | "Country" | "Award" => (SortKey::Title, true),
        category::HD
        | category::HD1080
        | category::HD720
        | category::THREE_D
        | category::WATCHED
        | category::UNWATCHED
        | category::ALL
        | category::TV_SHOWS
        | category::MOVIES => (SortKey::Title, true),
        "Ratings" | category::RATING => (SortKey::Rating, false),
        category::TOP250 => (SortKey::Top250, true),
        category::NEW | category::NEW_MOVIE | category::NEW_TV => (SortKey::New, false),
        _ => return None,
    };
    Some(sort)
}

/// Override key: lowercase, spaces removed (`TV Shows` → `tvshows`).
fn override_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// Resolve the ordering for a category of `dimension`.
pub fn resolve(config: &IndexConfig, dimension: Dimension, label: &str) -> SortOrder {
    if dimension == Dimension::Set {
        return SortOrder::Set(label.to_string());
    }
    let canonical = if dimension == Dimension::Other {
        config.original_category(label)
    } else {
        dimension.as_str()
    };
    let Some((mut key, mut ascending)) = default_sort(canonical) else {
        return SortOrder::Natural;
    };

    if let Some(custom) = config.sort_overrides.get(&override_key(canonical)) {
        if let Some(by) = custom.by.as_deref() {
            match SortKey::from_str(by) {
                Some(parsed) => key = parsed,
                None => warn!(
                    category = %canonical,
                    sort = %by,
                    default = key.as_str(),
                    "invalid sort key, using default"
                ),
            }
        }
        if let Some(asc) = custom.ascending {
            ascending = asc;
        }
    }
    SortOrder::By { key, ascending }
}

/// Comparator bound to one build's sort-ignore prefixes.
#[derive(Debug, Clone)]
pub struct EntrySorter {
    ignore_prefixes: Vec<String>,
}

impl EntrySorter {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            ignore_prefixes: config.sort_ignore_prefixes.clone(),
        }
    }

    pub fn natural(&self, a: &Entry, b: &Entry) -> Ordering {
        a.stripped_title_sort(&self.ignore_prefixes)
            .cmp(&b.stripped_title_sort(&self.ignore_prefixes))
    }

    pub fn compare(&self, order: &SortOrder, a: &Entry, b: &Entry) -> Ordering {
        match order {
            SortOrder::Natural => self.natural(a, b),
            SortOrder::Set(set) => self.compare_in_set(set, a, b),
            SortOrder::By { key, ascending } => {
                let directed = |ord: Ordering| if *ascending { ord } else { ord.reverse() };
                match key {
                    SortKey::Title => directed(self.natural(a, b)),
                    SortKey::New => directed(a.last_modified().cmp(&b.last_modified())),
                    SortKey::Rating => directed(a.rating().cmp(&b.rating()))
                        .then_with(|| self.natural(a, b)),
                    SortKey::Top250 => {
                        let rank = |e: &Entry| e.top250().filter(|r| *r > 0);
                        match (rank(a), rank(b)) {
                            (Some(x), Some(y)) => directed(x.cmp(&y)),
                            (Some(_), None) => Ordering::Less,
                            (None, Some(_)) => Ordering::Greater,
                            (None, None) => self.natural(a, b),
                        }
                    }
                    SortKey::Year => {
                        let year = |e: &Entry| e.year().and_then(|y| y.trim().parse::<i32>().ok());
                        directed(
                            year(a)
                                .cmp(&year(b))
                                .then_with(|| a.release_date().cmp(&b.release_date())),
                        )
                        .then_with(|| self.natural(a, b))
                    }
                }
            }
        }
    }

    /// Ordinal present first, then ordinal, then year, then sort title.
    pub fn compare_in_set(&self, set: &str, a: &Entry, b: &Entry) -> Ordering {
        let (oa, ob) = (a.set_order(set), b.set_order(set));
        let ordinal = match (oa, ob) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        ordinal
            .then_with(|| a.year().cmp(&b.year()))
            .then_with(|| self.natural(a, b))
    }

    /// Stable sort of one category list.
    pub fn sort(&self, order: &SortOrder, list: &mut [Entry]) {
        list.sort_by(|a, b| self.compare(order, a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use jukebox_core::config::SortOverride;
    use jukebox_core::types::SetMembership;
    use jukebox_core::Item;

    fn entry(title: &str, f: impl FnOnce(&mut Item)) -> Entry {
        let mut item = Item {
            title: title.into(),
            year: Some("2000".into()),
            base_name: title.into(),
            ..Default::default()
        };
        f(&mut item);
        Entry::from(item)
    }

    fn titles(list: &[Entry]) -> Vec<&str> {
        list.iter().map(Entry::title).collect()
    }

    #[test]
    fn resolution_table() {
        let config = IndexConfig::default();
        assert_eq!(
            resolve(&config, Dimension::Title, "A"),
            SortOrder::By {
                key: SortKey::Title,
                ascending: true
            }
        );
        assert_eq!(
            resolve(&config, Dimension::Other, "New"),
            SortOrder::By {
                key: SortKey::New,
                ascending: false
            }
        );
        assert_eq!(
            resolve(&config, Dimension::Ratings, "7.0-7.9"),
            SortOrder::By {
                key: SortKey::Rating,
                ascending: false
            }
        );
        assert_eq!(resolve(&config, Dimension::Other, "Sets"), SortOrder::Natural);
        assert_eq!(resolve(&config, Dimension::Other, "Extras"), SortOrder::Natural);
        assert_eq!(
            resolve(&config, Dimension::Set, "Saga"),
            SortOrder::Set("Saga".into())
        );
    }

    #[test]
    fn renamed_other_categories_resolve_to_canonical() {
        let mut config = IndexConfig::default();
        config.categories[1].rename = Some("Fresh".into());
        assert_eq!(config.categories[1].name, "New");
        assert_eq!(
            resolve(&config, Dimension::Other, "Fresh"),
            SortOrder::By {
                key: SortKey::New,
                ascending: false
            }
        );
    }

    #[test]
    fn overrides_and_invalid_keys() {
        let mut config = IndexConfig::default();
        config.sort_overrides.insert(
            "tvshows".into(),
            SortOverride {
                by: Some("year".into()),
                ascending: Some(false),
            },
        );
        config.sort_overrides.insert(
            "genres".into(),
            SortOverride {
                by: Some("bogus".into()),
                ascending: None,
            },
        );
        assert_eq!(
            resolve(&config, Dimension::Other, "TV Shows"),
            SortOrder::By {
                key: SortKey::Year,
                ascending: false
            }
        );
        assert_eq!(
            resolve(&config, Dimension::Genres, "Drama"),
            SortOrder::By {
                key: SortKey::Title,
                ascending: true
            }
        );
    }

    #[test]
    fn title_ascending_ignores_prefixes() {
        let config = IndexConfig {
            sort_ignore_prefixes: vec!["The ".into()],
            ..Default::default()
        };
        let sorter = EntrySorter::new(&config);
        let mut list = vec![
            entry("The Zoo", |_| {}),
            entry("apple", |_| {}),
            entry("Mango", |_| {}),
        ];
        sorter.sort(&resolve(&config, Dimension::Title, "A"), &mut list);
        assert_eq!(titles(&list), ["apple", "Mango", "The Zoo"]);
    }

    #[test]
    fn new_is_most_recent_first() {
        let config = IndexConfig::default();
        let sorter = EntrySorter::new(&config);
        let at = |d| Some(Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap());
        let mut list = vec![
            entry("Old", |i| i.file_date = at(1)),
            entry("Newest", |i| i.file_date = at(20)),
            entry("Middle", |i| i.file_date = at(10)),
        ];
        sorter.sort(&resolve(&config, Dimension::Other, "New"), &mut list);
        assert_eq!(titles(&list), ["Newest", "Middle", "Old"]);
    }

    #[test]
    fn natural_order_is_stable_for_unconfigured_categories() {
        let config = IndexConfig::default();
        let sorter = EntrySorter::new(&config);
        let mut list = vec![entry("B", |_| {}), entry("a", |_| {}), entry("C", |_| {})];
        sorter.sort(&SortOrder::Natural, &mut list);
        assert_eq!(titles(&list), ["a", "B", "C"]);
    }

    #[test]
    fn rating_descending_ties_on_title() {
        let config = IndexConfig::default();
        let sorter = EntrySorter::new(&config);
        let rated = |t: &str, r: i32| entry(t, |i| {
            i.ratings.insert("imdb".into(), r);
        });
        let mut list = vec![rated("B", 70), rated("C", 90), rated("A", 70)];
        sorter.sort(&resolve(&config, Dimension::Ratings, "7.0-7.9"), &mut list);
        assert_eq!(titles(&list), ["C", "A", "B"]);
    }

    #[test]
    fn top250_ranked_entries_first() {
        let config = IndexConfig::default();
        let sorter = EntrySorter::new(&config);
        let mut list = vec![
            entry("Unranked", |_| {}),
            entry("Ten", |i| i.top250 = Some(10)),
            entry("Two", |i| i.top250 = Some(2)),
        ];
        sorter.sort(&resolve(&config, Dimension::Other, "Top250"), &mut list);
        assert_eq!(titles(&list), ["Two", "Ten", "Unranked"]);
    }

    #[test]
    fn set_order_uses_ordinals_then_year() {
        let config = IndexConfig::default();
        let sorter = EntrySorter::new(&config);
        let in_set = |t: &str, order: Option<i32>, year: &str| {
            let year = year.to_string();
            entry(t, move |i| {
                i.year = Some(year);
                i.sets = vec![SetMembership {
                    name: "Saga".into(),
                    order,
                }];
            })
        };
        let mut list = vec![
            in_set("Spinoff", None, "1990"),
            in_set("Sequel", Some(2), "1985"),
            in_set("Prequel", None, "1980"),
            in_set("Original", Some(1), "1982"),
        ];
        sorter.sort(&SortOrder::Set("Saga".into()), &mut list);
        assert_eq!(titles(&list), ["Original", "Sequel", "Prequel", "Spinoff"]);
    }
}
