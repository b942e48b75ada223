//! History records as returned by the library apps.
//!
//! Sonarr and Radarr return slightly different shapes; both are folded into
//! a single [`HistoryEvent`] before reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded action for a library item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Episode id for series, movie id for movies
    pub sub_item_id: i64,

    /// Torrent hash reported by the download client (may be empty or bogus)
    pub download_id: String,

    /// When the library app recorded the action
    pub timestamp: DateTime<Utc>,

    /// What happened
    pub kind: HistoryEventKind,
}

impl HistoryEvent {
    /// Create a new history event
    pub fn new(
        sub_item_id: i64,
        download_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        kind: HistoryEventKind,
    ) -> Self {
        Self {
            sub_item_id,
            download_id: download_id.into(),
            timestamp,
            kind,
        }
    }

    /// A deletion the library app has not recorded yet.
    ///
    /// Stamped with the current time so it sorts ahead of everything the
    /// upstream history already knows about.
    pub fn local_delete(sub_item_id: i64) -> Self {
        Self::new(sub_item_id, "", Utc::now(), HistoryEventKind::Deleted)
    }
}

/// Types of history entries the reconciliation cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventKind {
    /// A downloaded file became the current file for the sub-item
    Imported,

    /// The sub-item's file was deleted
    Deleted,

    /// Grabs, failures, renames and anything else
    Other,
}

impl HistoryEventKind {
    /// Map the `eventType` string used by the library API
    pub fn from_api(event_type: &str) -> Self {
        match event_type {
            "downloadFolderImported" => Self::Imported,
            "episodeFileDeleted" | "movieFileDeleted" => Self::Deleted,
            _ => Self::Other,
        }
    }
}
