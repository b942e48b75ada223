//! arrcoon - torrent cleanup for Sonarr and Radarr
//!
//! Runs as a custom script hooked into Sonarr/Radarr. On every event it
//! works out, from the library's own history, which torrents no longer back
//! a current file and removes them (with their data) from the torrent
//! client.
//!
//! # Architecture
//!
//! One invocation handles exactly one event and exits:
//! - History is fetched from the library API and reconciled in memory
//! - A local index remembers every hash ever seen per series/movie, so a
//!   full delete still knows what to remove after the history is gone
//! - The torrent client is one of qBittorrent, Transmission or rTorrent,
//!   chosen once from configuration
//!
//! # Modules
//!
//! - `adapters`: Library API and torrent client transports
//! - `core`: Hash validation, reconciliation, index store, retry policy
//! - `domain`: Data structures (HistoryEvent, DownloadIdSet)
//! - `handlers`: Per-event workflows for Sonarr and Radarr
//! - `config`: YAML configuration and home-directory paths
//! - `cli`: Command-line / environment interface
//!
//! # Usage
//!
//! ```bash
//! # As configured in Sonarr/Radarr: Settings > Connect > Custom Script
//! sonarr_eventtype=Download sonarr_series_id=85 arrcoon
//!
//! # Check the torrent client connection
//! arrcoon_eventtype=test_torrent_client arrcoon
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod handlers;

// Re-export main types at crate root for convenience
pub use adapters::{App, ArrClient, TorrentClient};
pub use crate::core::{IndexStore, Namespace};
pub use domain::{DownloadIdSet, HistoryEvent, HistoryEventKind};
pub use handlers::{EventHandler, HandlerError, RadarrEvent, SonarrEvent};
