//! Sonarr events.

use tracing::{debug, info};

use super::{parse_id, EventHandler, HandlerError};
use crate::adapters::App;

/// Raw event fields as Sonarr exports them
#[derive(Debug, Default, Clone, Copy)]
pub struct SonarrFields<'a> {
    pub series_id: Option<&'a str>,
    pub download_id: Option<&'a str>,
    pub series_title: Option<&'a str>,
    pub episode_file_id: Option<&'a str>,
    /// Comma-separated ids of the episodes a file belonged to
    pub episode_ids: Option<&'a str>,
}

/// A Sonarr event with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SonarrEvent {
    Test,
    Grab {
        series_id: i64,
        download_id: String,
        series_title: Option<String>,
    },
    Download { series_id: i64 },
    EpisodeFileDelete {
        series_id: i64,
        episode_file_id: Option<String>,
        episode_ids: Vec<i64>,
    },
    SeriesDelete { series_id: i64 },
    Other(String),
}

impl SonarrEvent {
    pub fn parse(event_type: &str, fields: SonarrFields<'_>) -> Result<Self, HandlerError> {
        let series_id = || parse_id(App::Sonarr, "sonarr_series_id", fields.series_id);
        let owned = |value: Option<&str>| value.map(str::to_string);

        let event = match event_type {
            "Test" => Self::Test,
            "Grab" => Self::Grab {
                series_id: series_id()?,
                download_id: fields.download_id.unwrap_or_default().trim().to_string(),
                series_title: owned(fields.series_title),
            },
            "Download" => Self::Download {
                series_id: series_id()?,
            },
            "EpisodeFileDelete" => Self::EpisodeFileDelete {
                series_id: series_id()?,
                episode_file_id: owned(fields.episode_file_id),
                episode_ids: parse_episode_ids(fields.episode_ids)?,
            },
            "SeriesDelete" => Self::SeriesDelete {
                series_id: series_id()?,
            },
            other => Self::Other(other.to_string()),
        };
        Ok(event)
    }

    /// Run the workflow bound to this event
    pub async fn handle(self, handler: &EventHandler<'_>) -> Result<(), HandlerError> {
        match self {
            Self::Test => {
                debug!("Handling Test event");
                handler.test().await?;
            }
            Self::Grab {
                series_id,
                download_id,
                series_title,
            } => {
                debug!(
                    series_id,
                    series_title = series_title.as_deref().unwrap_or_default(),
                    download_id = %download_id,
                    "Handling Grab event"
                );
                handler.grab(series_id, &download_id).await;
            }
            Self::Download { series_id } => {
                debug!(series_id, "Handling Download event");
                handler.import(series_id).await;
            }
            Self::EpisodeFileDelete {
                series_id,
                episode_file_id,
                episode_ids,
            } => {
                debug!(
                    series_id,
                    episode_file_id = episode_file_id.as_deref().unwrap_or_default(),
                    episode_ids = ?episode_ids,
                    "Handling EpisodeFileDelete event"
                );
                handler.delete_sub_items(series_id, &episode_ids).await;
            }
            Self::SeriesDelete { series_id } => {
                debug!(series_id, "Handling SeriesDelete event");
                handler.delete_item(series_id).await;
            }
            Self::Other(name) => {
                info!(event = %name, "Ignoring Sonarr event type");
            }
        }
        Ok(())
    }
}

fn parse_episode_ids(raw: Option<&str>) -> Result<Vec<i64>, HandlerError> {
    let ids = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_id(App::Sonarr, "sonarr_episodefile_episodeids", Some(part)))
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(HandlerError::InvalidEvent {
            app: App::Sonarr,
            reason: "sonarr_episodefile_episodeids is empty".to_string(),
        });
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::super::testing::RecordingClient;
    use super::*;
    use crate::adapters::ArrClient;
    use crate::config::Timeouts;
    use crate::core::{IndexStore, Namespace};
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    const HASH_A: &str = "AAAAA4F4132C4AC7031F5692F36AC77A2ECBCCBB";
    const HASH_B: &str = "BBBBB4F4132C4AC7031F5692F36AC77A2ECBCCBB";

    fn handler<'a>(server: &MockServer, torrents: &'a RecordingClient, temp: &TempDir) -> EventHandler<'a> {
        let api = ArrClient::new(App::Sonarr, &server.base_url(), "token", &Timeouts::default())
            .unwrap();
        EventHandler::new(api, torrents, IndexStore::new(temp.path()))
    }

    fn mock_history(server: &MockServer, series_id: i64, body: serde_json::Value) {
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/history/series")
                .query_param("seriesId", series_id.to_string());
            then.status(200).json_body(body);
        });
    }

    #[test]
    fn test_parse_events() {
        let fields = SonarrFields {
            series_id: Some("85"),
            download_id: Some(HASH_B),
            series_title: Some("Severance"),
            episode_file_id: Some("1512"),
            episode_ids: Some("3752, 3753"),
        };

        assert_eq!(SonarrEvent::parse("Test", SonarrFields::default()).unwrap(), SonarrEvent::Test);
        assert_eq!(
            SonarrEvent::parse("Grab", fields).unwrap(),
            SonarrEvent::Grab {
                series_id: 85,
                download_id: HASH_B.to_string(),
                series_title: Some("Severance".to_string())
            }
        );
        assert_eq!(
            SonarrEvent::parse("EpisodeFileDelete", fields).unwrap(),
            SonarrEvent::EpisodeFileDelete {
                series_id: 85,
                episode_file_id: Some("1512".to_string()),
                episode_ids: vec![3752, 3753]
            }
        );
        assert_eq!(
            SonarrEvent::parse("Rename", fields).unwrap(),
            SonarrEvent::Other("Rename".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        let fields = SonarrFields {
            series_id: Some("eighty-five"),
            ..Default::default()
        };
        assert!(SonarrEvent::parse("Download", fields).is_err());

        let fields = SonarrFields {
            series_id: Some("85"),
            episode_ids: Some(""),
            ..Default::default()
        };
        let err = SonarrEvent::parse("EpisodeFileDelete", fields).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_episode_file_delete_removes_deleted_file_hash() {
        let server = MockServer::start_async().await;
        mock_history(
            &server,
            85,
            json!([{
                "episodeId": 3752,
                "downloadId": HASH_B,
                "date": "2024-05-01T12:00:00Z",
                "eventType": "downloadFolderImported"
            }]),
        );
        let temp = TempDir::new().unwrap();
        let torrents = RecordingClient::default();

        let event = SonarrEvent::parse(
            "EpisodeFileDelete",
            SonarrFields {
                series_id: Some("85"),
                episode_file_id: Some("1512"),
                episode_ids: Some("3752"),
                ..Default::default()
            },
        )
        .unwrap();
        event.handle(&handler(&server, &torrents, &temp)).await.unwrap();

        assert_eq!(torrents.calls(), vec![vec![HASH_B.to_string()]]);
    }

    #[tokio::test]
    async fn test_partial_delete_keeps_shared_hash() {
        let server = MockServer::start_async().await;
        // One season pack imported for two episodes; only episode 2's file goes
        mock_history(
            &server,
            3,
            json!([
                {"episodeId": 1, "downloadId": HASH_A, "date": "2024-01-01T00:00:00Z", "eventType": "downloadFolderImported"},
                {"episodeId": 2, "downloadId": HASH_A, "date": "2024-01-01T00:00:00Z", "eventType": "downloadFolderImported"}
            ]),
        );
        let temp = TempDir::new().unwrap();
        let torrents = RecordingClient::default();

        SonarrEvent::EpisodeFileDelete {
            series_id: 3,
            episode_file_id: None,
            episode_ids: vec![2],
        }
        .handle(&handler(&server, &torrents, &temp))
        .await
        .unwrap();

        assert!(torrents.calls().is_empty());
    }

    #[tokio::test]
    async fn test_download_removes_superseded_release() {
        let server = MockServer::start_async().await;
        mock_history(
            &server,
            4,
            json!([
                {"episodeId": 10, "downloadId": HASH_A, "date": "2024-01-01T00:00:00Z", "eventType": "downloadFolderImported"},
                {"episodeId": 10, "downloadId": HASH_B, "date": "2024-02-01T00:00:00Z", "eventType": "downloadFolderImported"},
                {"episodeId": 10, "downloadId": HASH_B, "date": "2024-01-31T00:00:00Z", "eventType": "grabbed"}
            ]),
        );
        let temp = TempDir::new().unwrap();
        let torrents = RecordingClient::default();

        SonarrEvent::Download { series_id: 4 }
            .handle(&handler(&server, &torrents, &temp))
            .await
            .unwrap();

        assert_eq!(torrents.calls(), vec![vec![HASH_A.to_string()]]);
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({"current": "v3"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/series")
                .query_param("includeSeasonImages", "false");
            then.status(200).json_body(json!([{"id": 1}, {"id": 2}]));
        });
        mock_history(
            &server,
            1,
            json!([
                {"episodeId": 1, "downloadId": HASH_B, "date": "2024-01-02T00:00:00Z", "eventType": "grabbed"},
                {"episodeId": 1, "downloadId": HASH_A, "date": "2024-01-01T00:00:00Z", "eventType": "grabbed"},
                {"episodeId": 1, "downloadId": HASH_B, "date": "2024-01-03T00:00:00Z", "eventType": "downloadFolderImported"}
            ]),
        );
        mock_history(&server, 2, json!([]));

        let temp = TempDir::new().unwrap();
        let torrents = RecordingClient::default();
        let handler = handler(&server, &torrents, &temp);
        let store = IndexStore::new(temp.path());

        SonarrEvent::Test.handle(&handler).await.unwrap();
        let first = (
            store.load(Namespace::Sonarr, "series_1").await,
            store.load(Namespace::Sonarr, "series_2").await,
        );

        SonarrEvent::Test.handle(&handler).await.unwrap();
        let second = (
            store.load(Namespace::Sonarr, "series_1").await,
            store.load(Namespace::Sonarr, "series_2").await,
        );

        assert_eq!(first.0, vec![HASH_B.to_string(), HASH_A.to_string()]);
        assert!(first.1.is_empty());
        assert!(store.entry_path(Namespace::Sonarr, "series_2").exists());
        assert_eq!(first, second);
        assert!(torrents.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_drops_stale_entries() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({"current": "v3"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/series");
            then.status(200).json_body(json!([]));
        });

        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        store
            .save(Namespace::Sonarr, "series_99", &[HASH_A.to_string()])
            .await
            .unwrap();
        let torrents = RecordingClient::default();

        let indexed = handler(&server, &torrents, &temp).test().await.unwrap();

        assert_eq!(indexed, 0);
        assert!(!store.entry_path(Namespace::Sonarr, "series_99").exists());
    }
}
