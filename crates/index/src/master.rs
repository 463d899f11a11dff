//! Set master synthesis.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use jukebox_core::config::SetsRating;
use jukebox_core::types::{Definition, ItemKind};
use jukebox_core::{Entry, IndexConfig, Item, MasterItem};
use regex::{Captures, Regex};
use tracing::debug;

use crate::category::CategoryIndex;
use crate::IndexError;

// Characters that cannot appear in a generated file name.
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());

/// Escape unsafe characters as `$XX` (hex code point).
pub fn safe_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(name, |caps: &Captures| {
            caps[0]
                .chars()
                .map(|c| format!("${:02X}", c as u32))
                .collect::<String>()
        })
        .into_owned()
}

pub fn master_base_name(set_name: &str) -> String {
    safe_filename(&format!("Set_{set_name}_1"))
}

/// Member with the lowest set ordinal; the first member wins ties and
/// unordered sets.
fn representative<'a>(set_name: &str, members: &'a [Arc<Item>]) -> Option<&'a Arc<Item>> {
    let mut best: Option<(&Arc<Item>, i32)> = None;
    for member in members {
        if let Some(order) = member.set_order(set_name) {
            if best.is_none_or(|(_, lowest)| order < lowest) {
                best = Some((member, order));
            }
        }
    }
    best.map(|(member, _)| member).or_else(|| members.first())
}

/// Build the master for one set from its member entries.
pub fn synthesize(set_name: &str, members: &[Entry], config: &IndexConfig) -> Result<MasterItem, IndexError> {
    let members: Vec<Arc<Item>> = members.iter().filter_map(Entry::as_item).cloned().collect();
    let Some(representative) = representative(set_name, &members).cloned() else {
        return Err(IndexError::EmptySet(set_name.to_string()));
    };

    let mut tv_count = 0;
    let mut hd_count = 0;
    let mut watched = true;
    let mut top250: Option<(u32, String)> = None;
    let mut max_rating: Option<i32> = None;
    let mut rating_sum = 0;
    let mut rated = 0;
    let mut definition = Definition::Sd;
    let mut dirty = BTreeSet::new();
    let mut files = Vec::new();
    let mut file_date = None;

    for member in &members {
        if member.is_tv() {
            tv_count += 1;
        }
        if member.definition.is_hd() {
            hd_count += 1;
        }
        definition = definition.max(member.definition);
        watched &= member.watched;

        if let Some(rank) = member.top250.filter(|r| *r > 0) {
            if top250.as_ref().is_none_or(|(best, _)| rank < *best) {
                top250 = Some((rank, member.key()));
            }
        }

        if let Some(rating) = member.rating() {
            rating_sum += rating;
            rated += 1;
            max_rating = max_rating.max(Some(rating));
        }

        files.extend(member.files.iter().cloned());
        file_date = file_date.max(member.last_modified());
        dirty.extend(member.dirty.iter().copied());
    }

    let rating = match config.sets_rating {
        SetsRating::Unset => None,
        SetsRating::First => representative.rating(),
        SetsRating::Max => max_rating,
        SetsRating::Average => (rated > 0).then(|| rating_sum / members.len() as i32),
    };

    let title_sort = if representative.is_tv() {
        representative.sort_title().to_string()
    } else {
        set_name.to_string()
    };
    let base_name = master_base_name(set_name);
    let poster = representative
        .poster
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| format!("{base_name}.jpg"));
    let (top250, top250_source) = match top250 {
        Some((rank, source)) => (Some(rank), Some(source)),
        None => (None, None),
    };

    let master = MasterItem {
        set_name: set_name.to_string(),
        title_sort,
        base_name,
        kind: if tv_count > 0 {
            ItemKind::TvShow
        } else {
            ItemKind::Movie
        },
        tv_count,
        hd_count,
        definition,
        watched,
        top250,
        top250_source,
        rating,
        file_date,
        dirty,
        files,
        poster,
        representative,
        members,
    };

    debug!(
        set = %master.set_name,
        size = master.set_size(),
        tv = master.tv_count,
        hd = master.hd_count,
        watched = master.watched,
        top250 = ?master.top250,
        rating = ?master.rating,
        "set master"
    );
    Ok(master)
}

/// One master per set label of the set index.
pub fn synthesize_masters(
    sets: &CategoryIndex,
    config: &IndexConfig,
) -> Result<BTreeMap<String, Arc<MasterItem>>, IndexError> {
    let mut masters = BTreeMap::new();
    for (set_name, members) in sets.iter() {
        let master = synthesize(set_name, members, config)?;
        masters.insert(set_name.to_string(), Arc::new(master));
    }
    Ok(masters)
}
