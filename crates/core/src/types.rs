use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used wherever the jukebox needs a printable "no value".
pub const UNKNOWN: &str = "UNKNOWN";

/// Media item kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Movie,
    TvShow,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tv_show",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video definition derived from the probed frame width.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Definition {
    #[default]
    Sd,
    Hd720,
    Hd1080,
}

impl Definition {
    pub fn is_hd(self) -> bool {
        !matches!(self, Self::Sd)
    }

    pub fn is_hd1080(self) -> bool {
        matches!(self, Self::Hd1080)
    }
}

/// Crew department of a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Actors,
    Directing,
    Writing,
    Other,
}

impl Department {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actors => "actors",
            Self::Directing => "directing",
            Self::Writing => "writing",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which parts of an item changed since the last jukebox run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyFlag {
    Info,
    Nfo,
    Fanart,
    Poster,
    Banner,
    Watched,
    Recheck,
}

/// Classification axis with its own bucket builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Other,
    Genres,
    Title,
    Certification,
    Year,
    Library,
    Cast,
    Director,
    Country,
    Writer,
    Award,
    Person,
    Ratings,
    Set,
}

impl Dimension {
    pub const ALL: [Dimension; 14] = [
        Self::Other,
        Self::Genres,
        Self::Title,
        Self::Certification,
        Self::Year,
        Self::Library,
        Self::Cast,
        Self::Director,
        Self::Country,
        Self::Writer,
        Self::Award,
        Self::Person,
        Self::Ratings,
        Self::Set,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Other => "Other",
            Self::Genres => "Genres",
            Self::Title => "Title",
            Self::Certification => "Certification",
            Self::Year => "Year",
            Self::Library => "Library",
            Self::Cast => "Cast",
            Self::Director => "Director",
            Self::Country => "Country",
            Self::Writer => "Writer",
            Self::Award => "Award",
            Self::Person => "Person",
            Self::Ratings => "Ratings",
            Self::Set => "Set",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical file (or part range) of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaFile {
    pub filename: String,
    pub first_part: u32,
    pub last_part: u32,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Trailer or bonus file attached to its parent item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraFile {
    pub filename: String,
    pub title: String,
    pub new_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMembership {
    pub name: String,
    #[serde(default)]
    pub order: Option<i32>,
}

/// A person's role on one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub name: String,
    pub department: Department,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    pub name: String,
    pub won: Vec<String>,
    pub nominated: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardEvent {
    pub name: String,
    pub awards: Vec<Award>,
}

/// A catalogued media unit: a movie, or one TV season's episode group.
///
/// Items arrive from scrapers with every attribute already resolved; the
/// index engine only reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub title: String,
    pub title_sort: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<String>,
    pub season: Option<u32>,
    pub kind: ItemKind,
    pub sets: Vec<SetMembership>,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub directors: Vec<String>,
    pub writers: Vec<String>,
    pub countries: Vec<String>,
    pub credits: Vec<Credit>,
    pub certification: Option<String>,
    /// Per-source rating on a 0-100 scale.
    pub ratings: BTreeMap<String, i32>,
    pub top250: Option<u32>,
    pub watched: bool,
    pub definition: Definition,
    pub three_d: bool,
    pub files: Vec<MediaFile>,
    pub extra_files: Vec<ExtraFile>,
    pub file_date: Option<DateTime<Utc>>,
    pub extra: bool,
    pub base_name: String,
    pub library_description: String,
    pub awards: Vec<AwardEvent>,
    pub release_date: Option<NaiveDate>,
    pub dirty: BTreeSet<DirtyFlag>,
    pub poster: Option<String>,
}

impl Item {
    pub fn is_tv(&self) -> bool {
        self.kind == ItemKind::TvShow || self.season.is_some()
    }

    /// Repository key: `title (year)` plus a zero-padded season for TV.
    pub fn key(&self) -> String {
        let year = self.year.as_deref().unwrap_or(UNKNOWN);
        let mut key = format!("{} ({})", self.title, year);
        if self.is_tv() {
            key.push_str(&format!(" Season {:03}", self.season.unwrap_or(0)));
        }
        key.to_lowercase()
    }

    pub fn sort_title(&self) -> &str {
        self.title_sort
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }

    pub fn original_title(&self) -> &str {
        self.original_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }

    pub fn set_order(&self, set: &str) -> Option<i32> {
        self.sets.iter().find(|s| s.name == set).and_then(|s| s.order)
    }

    /// Average over all non-negative source ratings, each capped at 100.
    pub fn rating(&self) -> Option<i32> {
        let valid: Vec<i64> = self
            .ratings
            .values()
            .filter(|r| **r >= 0)
            .map(|r| i64::from((*r).min(100)))
            .collect();
        if valid.is_empty() {
            return None;
        }
        let average = valid.iter().sum::<i64>() / valid.len() as i64;
        i32::try_from(average).ok()
    }

    /// Newest timestamp among the file date and every media file.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.files
            .iter()
            .filter_map(|f| f.last_modified)
            .chain(self.file_date)
            .max()
    }

    /// Lowest first-part (episode) number over all files.
    pub fn first_part(&self) -> Option<u32> {
        self.files.iter().map(|f| f.first_part).min()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    /// Add a file unless one with the same name is already attached.
    pub fn add_file(&mut self, file: MediaFile) {
        if !self.files.iter().any(|f| f.filename == file.filename) {
            self.files.push(file);
        }
    }

    pub fn add_file_date(&mut self, date: Option<DateTime<Utc>>) {
        if let Some(date) = date {
            if self.file_date.is_none_or(|current| date > current) {
                self.file_date = Some(date);
            }
        }
    }
}

/// A person known to the jukebox, independent of any single item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    pub name: String,
    /// External identifier; people without one are "incomplete".
    pub id: Option<String>,
    pub departments: Vec<Department>,
}

impl Person {
    pub fn key(&self) -> String {
        format!("{}/{}", self.name, self.id.as_deref().unwrap_or(UNKNOWN)).to_lowercase()
    }

    pub fn is_complete(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
