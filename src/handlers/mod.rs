//! Event handlers for the library apps.
//!
//! Each invocation carries exactly one library event. [`EventHandler`] holds
//! the collaborators (library API, torrent client, index) and implements the
//! per-event workflows; `sonarr` and `radarr` bind event names to them.

pub mod radarr;
pub mod sonarr;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::{App, ArrClient, ArrError, ClientError, TorrentClient};
use crate::core::{is_valid_download_id, known_hashes, outdated, IndexError, IndexStore};
use crate::domain::{DownloadIdSet, HistoryEvent};

// Re-export the event types
pub use radarr::RadarrEvent;
pub use sonarr::SonarrEvent;

/// Handler outcomes that stop the process
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Couldn't connect to {app} API: {source}")]
    ApiUnreachable {
        app: App,
        #[source]
        source: ArrError,
    },

    #[error("Torrent client '{client}' failed its connectivity test: {source}")]
    ClientUnreachable {
        client: String,
        #[source]
        source: ClientError,
    },

    #[error("Index rebuild failed: {0}")]
    IndexRebuild(#[from] IndexError),

    #[error("Invalid {app} event: {reason}")]
    InvalidEvent { app: App, reason: String },
}

impl HandlerError {
    /// Whether this outcome should fail the process.
    ///
    /// Malformed event payloads are logged and otherwise ignored.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidEvent { .. })
    }
}

/// Parse a numeric id from an event field
pub fn parse_id(app: App, field: &str, value: Option<&str>) -> Result<i64, HandlerError> {
    let raw = value.unwrap_or_default().trim();
    raw.parse().map_err(|_| HandlerError::InvalidEvent {
        app,
        reason: format!("{} '{}' is not an integer", field, raw),
    })
}

/// Check a torrent client, mapping failure to [`HandlerError::ClientUnreachable`]
pub async fn test_torrent_client(torrents: &dyn TorrentClient) -> Result<(), HandlerError> {
    info!(client = torrents.name(), "Testing torrent client accessibility");
    torrents
        .test()
        .await
        .map_err(|source| HandlerError::ClientUnreachable {
            client: torrents.name().to_string(),
            source,
        })
}

/// Collaborators for one library app
pub struct EventHandler<'a> {
    api: ArrClient,
    torrents: &'a dyn TorrentClient,
    index: IndexStore,
}

impl<'a> EventHandler<'a> {
    pub fn new(api: ArrClient, torrents: &'a dyn TorrentClient, index: IndexStore) -> Self {
        Self {
            api,
            torrents,
            index,
        }
    }

    pub fn app(&self) -> App {
        self.api.app()
    }

    /// Live history of an item; fetch failures degrade to an empty history
    async fn history(&self, item_id: i64) -> Vec<HistoryEvent> {
        match self.api.history(item_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(app = %self.app(), item_id, error = %e, "Couldn't fetch history");
                Vec::new()
            }
        }
    }

    /// Hand ids to the torrent client; failures are logged only
    async fn remove(&self, item_id: i64, hashes: DownloadIdSet) {
        if hashes.is_empty() {
            debug!(app = %self.app(), item_id, "Nothing to remove");
            return;
        }

        let hashes = hashes.into_vec();
        info!(app = %self.app(), item_id, hashes = ?hashes, "Removing torrents");
        if let Err(e) = self.torrents.remove_torrents(&hashes).await {
            error!(
                app = %self.app(),
                client = self.torrents.name(),
                item_id,
                error = %e,
                "Torrent removal failed"
            );
        }
    }

    /// Connectivity test: check the API, then rebuild the whole index.
    ///
    /// Returns the number of indexed items.
    pub async fn test(&self) -> Result<usize, HandlerError> {
        info!(app = %self.app(), "Testing library API accessibility");
        self.api
            .api_info()
            .await
            .map_err(|source| HandlerError::ApiUnreachable {
                app: self.app(),
                source,
            })?;

        self.index.drop_all(self.app().namespace()).await?;
        self.rebuild().await
    }

    /// Index every item the library knows; any save failure aborts
    pub async fn rebuild(&self) -> Result<usize, HandlerError> {
        let namespace = self.app().namespace();
        info!(app = %self.app(), "Building index");

        let item_ids = match self.api.item_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(app = %self.app(), error = %e, "Couldn't list library items");
                Vec::new()
            }
        };

        let mut indexed = 0;
        for item_id in item_ids {
            let history = self.history(item_id).await;
            let hashes = known_hashes(&history, std::iter::empty::<&str>());
            debug!(app = %self.app(), item_id, hashes = ?hashes, "Deduplicated download ids");

            self.index
                .save(namespace, &namespace.key(item_id), &hashes.into_vec())
                .await?;
            indexed += 1;
        }

        info!(app = %self.app(), indexed, "Index built");
        Ok(indexed)
    }

    /// Grab: record the new id alongside every id in the item's history
    pub async fn grab(&self, item_id: i64, download_id: &str) {
        if !is_valid_download_id(download_id) {
            debug!(app = %self.app(), item_id, download_id, "Grab without a torrent hash, skipping");
            return;
        }

        let namespace = self.app().namespace();
        let history = self.history(item_id).await;
        let hashes = known_hashes(&history, [download_id]);
        debug!(app = %self.app(), item_id, hashes = ?hashes, "Deduplicated download ids");

        if let Err(e) = self
            .index
            .save(namespace, &namespace.key(item_id), &hashes.into_vec())
            .await
        {
            error!(app = %self.app(), item_id, error = %e, "Couldn't update index entry");
        }
    }

    /// Import: remove torrents no longer backing any current file
    pub async fn import(&self, item_id: i64) {
        let history = self.history(item_id).await;
        let stale = outdated(self.app().grouping(), &history, &[]);
        self.remove(item_id, stale).await;
    }

    /// Partial delete: the listed sub-items just lost their files
    pub async fn delete_sub_items(&self, item_id: i64, sub_item_ids: &[i64]) {
        let history = self.history(item_id).await;
        let local_deletes: Vec<HistoryEvent> = sub_item_ids
            .iter()
            .map(|id| HistoryEvent::local_delete(*id))
            .collect();

        let stale = outdated(self.app().grouping(), &history, &local_deletes);
        self.remove(item_id, stale).await;
    }

    /// Full delete: everything the index ever recorded for the item goes
    pub async fn delete_item(&self, item_id: i64) {
        let namespace = self.app().namespace();
        let key = namespace.key(item_id);

        let hashes = self.index.load(namespace, &key).await;
        self.remove(item_id, hashes.into_iter().collect()).await;

        if let Err(e) = self.index.delete(namespace, &key).await {
            error!(app = %self.app(), item_id, error = %e, "Couldn't remove index entry");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::adapters::{ClientError, TorrentClient};

    /// Torrent client double that records every removal request
    #[derive(Default)]
    pub struct RecordingClient {
        pub removed: Mutex<Vec<Vec<String>>>,
        pub fail_test: bool,
    }

    impl RecordingClient {
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.removed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TorrentClient for RecordingClient {
        fn name(&self) -> &str {
            "recording"
        }

        async fn test(&self) -> Result<(), ClientError> {
            if self.fail_test {
                return Err(ClientError::Unsupported("offline".to_string()));
            }
            Ok(())
        }

        async fn remove_torrents(&self, hashes: &[String]) -> Result<(), ClientError> {
            self.removed.lock().unwrap().push(hashes.to_vec());
            Ok(())
        }
    }
}
