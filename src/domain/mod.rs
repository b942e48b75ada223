//! Domain types for arrcoon.
//!
//! - History: library-app history records, normalised across Sonarr/Radarr
//! - DownloadIdSet: ordered, de-duplicated torrent hashes

pub mod download_ids;
pub mod history;

// Re-export commonly used types
pub use download_ids::DownloadIdSet;
pub use history::{HistoryEvent, HistoryEventKind};
