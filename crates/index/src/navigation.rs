//! First/previous/next/last links over the final entry list.

use jukebox_core::Entry;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub first: String,
    pub previous: String,
    pub next: String,
    pub last: String,
}

#[derive(Debug, Clone)]
pub struct LinkedEntry {
    pub entry: Entry,
    pub navigation: Navigation,
}

/// Link non-extras among themselves, then extras among themselves.
///
/// Relative order is kept inside each partition; at either end the link
/// points back at the boundary entry.
pub fn link(entries: Vec<Entry>) -> Vec<LinkedEntry> {
    let (main, extras): (Vec<Entry>, Vec<Entry>) =
        entries.into_iter().partition(|e| !e.is_extra());
    let mut linked = link_partition(main);
    linked.extend(link_partition(extras));
    linked
}

fn link_partition(entries: Vec<Entry>) -> Vec<LinkedEntry> {
    let names: Vec<String> = entries.iter().map(|e| e.base_name().to_string()).collect();
    let (Some(first), Some(last)) = (names.first(), names.last()) else {
        return Vec::new();
    };
    let end = names.len() - 1;

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| LinkedEntry {
            navigation: Navigation {
                first: first.clone(),
                previous: names[i.saturating_sub(1)].clone(),
                next: names[(i + 1).min(end)].clone(),
                last: last.clone(),
            },
            entry,
        })
        .collect()
}
