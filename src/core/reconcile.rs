//! Reconciliation of library history against torrent hashes.
//!
//! Given the history of one series or movie, work out which torrent hashes
//! are still backing a current file and which ones are garbage. A hash is
//! only ever reported as outdated if no sub-item of the item still relies
//! on it.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::hash::is_valid_download_id;
use crate::domain::{DownloadIdSet, HistoryEvent, HistoryEventKind};

/// How history entries are grouped before picking the current file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Series: every episode has its own current file
    BySubItem,

    /// Movies: the item has exactly one current file
    Single,
}

/// Every valid hash seen in `events`, followed by `extra`, in first-seen order.
pub fn known_hashes<I, S>(events: &[HistoryEvent], extra: I) -> DownloadIdSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut known = DownloadIdSet::new();

    for event in events {
        if is_valid_download_id(&event.download_id) {
            known.insert(event.download_id.as_str());
        }
    }
    for id in extra {
        let id = id.as_ref();
        if is_valid_download_id(id) {
            known.insert(id);
        }
    }

    known
}

/// Hashes that no longer back the current file of any sub-item.
///
/// `local_deletes` are deletions the library app has not written to its
/// history yet; they only apply to [`Grouping::BySubItem`].
pub fn outdated(
    grouping: Grouping,
    events: &[HistoryEvent],
    local_deletes: &[HistoryEvent],
) -> DownloadIdSet {
    let outdated = match grouping {
        Grouping::BySubItem => outdated_by_sub_item(events, local_deletes),
        Grouping::Single => outdated_single(events),
    };

    debug!(?grouping, outdated = ?outdated, "Outdated hashes computed");
    outdated
}

fn is_valid_import(event: &HistoryEvent) -> bool {
    event.kind == HistoryEventKind::Imported && is_valid_download_id(&event.download_id)
}

/// Most recent first. `sort_by` is stable, so equal timestamps keep their
/// original order.
fn sort_newest_first(events: &mut [&HistoryEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn outdated_by_sub_item(events: &[HistoryEvent], local_deletes: &[HistoryEvent]) -> DownloadIdSet {
    let mut groups: BTreeMap<i64, Vec<&HistoryEvent>> = BTreeMap::new();

    for event in events
        .iter()
        .chain(local_deletes)
        .filter(|e| is_valid_import(e) || e.kind == HistoryEventKind::Deleted)
    {
        groups.entry(event.sub_item_id).or_default().push(event);
    }

    let mut relevant = DownloadIdSet::new();
    let mut outdated = DownloadIdSet::new();

    for (sub_item_id, group) in groups.iter_mut() {
        sort_newest_first(group);
        trace!(sub_item_id, history = ?group, "Sub-item history");

        let Some((latest, older)) = group.split_first() else {
            continue;
        };

        // A deleted file leaves the sub-item without a current hash
        if latest.kind == HistoryEventKind::Imported {
            relevant.insert(latest.download_id.as_str());
        }

        for event in older {
            if is_valid_download_id(&event.download_id) {
                outdated.insert(event.download_id.as_str());
            }
        }
    }

    outdated.subtract(&relevant);
    outdated
}

fn outdated_single(events: &[HistoryEvent]) -> DownloadIdSet {
    let mut imports: Vec<&HistoryEvent> = events.iter().filter(|e| is_valid_import(e)).collect();
    sort_newest_first(&mut imports);
    trace!(history = ?imports, "Imported history");

    let Some((latest, older)) = imports.split_first() else {
        return DownloadIdSet::new();
    };
    if older.is_empty() {
        debug!("Nothing to remove");
        return DownloadIdSet::new();
    }

    let mut outdated: DownloadIdSet = older.iter().map(|e| e.download_id.as_str()).collect();
    outdated.remove(&latest.download_id);
    outdated
}
