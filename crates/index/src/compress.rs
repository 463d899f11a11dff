//! Set compression: collapsing set members in a category into their master.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use jukebox_core::{Dimension, Entry, IndexConfig, MasterItem};
use tracing::trace;

use crate::category::CategoryIndex;

/// What happens to a qualifying set inside one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPolicy {
    /// Members are replaced by the master.
    Compress,
    /// Members stay and the master is added next to them.
    KeepExploded,
    /// Members stay, no master.
    KeepExplodedRemoveMaster,
    /// TV sets compress; movie sets explode.
    KeepTvOnly { remove_master: bool },
}

impl CompressionPolicy {
    /// Resolve the explode settings for one category of `dimension`.
    pub fn resolve(config: &IndexConfig, dimension: Dimension, label: &str) -> Self {
        let explode = config.explodes(dimension.as_str())
            || (dimension == Dimension::Other
                && (config.explodes(label) || config.explodes(config.original_category(label))));
        if !explode {
            return Self::Compress;
        }
        match (config.explode_keep_tv, config.explode_remove_master) {
            (true, remove_master) => Self::KeepTvOnly { remove_master },
            (false, false) => Self::KeepExploded,
            (false, true) => Self::KeepExplodedRemoveMaster,
        }
    }

    /// `(remove members, add master)` for a set of the given kind.
    pub fn action(self, tv_set: bool) -> (bool, bool) {
        match self {
            Self::Compress => (true, true),
            Self::KeepExploded => (false, true),
            Self::KeepExplodedRemoveMaster => (false, false),
            Self::KeepTvOnly { .. } if tv_set => (true, true),
            Self::KeepTvOnly { remove_master } => (false, !remove_master),
        }
    }

    pub fn explodes(self, tv_set: bool) -> bool {
        !self.action(tv_set).0
    }
}

/// Compress one category list against every set.
///
/// All intersections are taken against the list as it was before any
/// substitution. When `apply_policy` is false every qualifying set is
/// compressed and exploding is left to [`explode_after_sort`].
pub fn compress_category(
    list: &mut Vec<Entry>,
    sets: &CategoryIndex,
    masters: &BTreeMap<String, Arc<MasterItem>>,
    policy: CompressionPolicy,
    apply_policy: bool,
    config: &IndexConfig,
) {
    let present: HashSet<usize> = list.iter().map(Entry::identity).collect();
    let mut qualifying = Vec::new();
    for (set_name, members) in sets.iter() {
        let hits: Vec<&Entry> = members
            .iter()
            .filter(|m| present.contains(&m.identity()))
            .collect();
        if hits.len() >= config.min_set_count
            && (!config.sets_require_all || hits.len() == members.len())
        {
            let tv_set = hits.first().is_some_and(|e| e.is_tv());
            let ids: HashSet<usize> = hits.iter().map(|e| e.identity()).collect();
            qualifying.push((set_name, ids, tv_set));
        }
    }

    for (set_name, ids, tv_set) in qualifying {
        let Some(master) = masters.get(set_name) else {
            continue;
        };
        let (remove, add) = if apply_policy {
            policy.action(tv_set)
        } else {
            (true, true)
        };
        if remove {
            list.retain(|e| !ids.contains(&e.identity()));
        }
        let master = Entry::Master(master.clone());
        if add && !list.iter().any(|e| e.same(&master)) {
            trace!(set = %set_name, "compressing set");
            list.push(master);
        }
    }
}

/// Compress every category of `index`.
pub fn compress_index(
    index: &mut CategoryIndex,
    sets: &CategoryIndex,
    masters: &BTreeMap<String, Arc<MasterItem>>,
    config: &IndexConfig,
) {
    let dimension = index.dimension();
    for (label, list) in index.iter_mut() {
        let policy = CompressionPolicy::resolve(config, dimension, label);
        compress_category(list, sets, masters, policy, config.explode_before_sort, config);
    }
}

/// Replace each master of an exploding category by its members that the
/// uncompressed category holds, ordered with `order_members`.
pub fn explode_after_sort<F>(
    list: &mut Vec<Entry>,
    uncompressed: &[Entry],
    policy: CompressionPolicy,
    mut order_members: F,
) where
    F: FnMut(&str, &mut Vec<Entry>),
{
    if policy == CompressionPolicy::Compress {
        return;
    }
    let in_category: HashSet<usize> = uncompressed.iter().map(Entry::identity).collect();
    let mut seen = HashSet::new();
    let mut exploded = Vec::with_capacity(list.len());

    for entry in list.drain(..) {
        let Some(master) = entry.as_master().cloned() else {
            if seen.insert(entry.identity()) {
                exploded.push(entry);
            }
            continue;
        };
        let mut members: Vec<Entry> = master
            .members
            .iter()
            .map(|m| Entry::Item(m.clone()))
            .filter(|m| in_category.contains(&m.identity()))
            .collect();
        let tv_set = members.first().is_some_and(|m| m.is_tv());
        let (remove, add) = policy.action(tv_set);
        if remove || members.is_empty() {
            if seen.insert(entry.identity()) {
                exploded.push(entry);
            }
            continue;
        }

        order_members(&master.set_name, &mut members);
        if add && seen.insert(entry.identity()) {
            exploded.push(entry);
        }
        for member in members {
            if seen.insert(member.identity()) {
                exploded.push(member);
            }
        }
    }
    *list = exploded;
}
