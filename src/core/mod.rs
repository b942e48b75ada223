//! Core reconciliation logic.
//!
//! This module contains:
//! - hash: torrent info-hash recognition
//! - index: per-item hash index on disk
//! - reconcile: outdated-hash computation from library history
//! - retry: retry policy for client calls

pub mod hash;
pub mod index;
pub mod reconcile;
pub mod retry;

// Re-export commonly used types
pub use hash::is_valid_download_id;
pub use index::{IndexError, IndexFile, IndexStore, Namespace};
pub use reconcile::{known_hashes, outdated, Grouping};
pub use retry::RetryPolicy;
