//! Sonarr/Radarr REST API client.
//!
//! Only the read side is used: the API version check, item listings and
//! per-item history. Auth is the `X-Api-Key` header.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::{base_url, http_client};
use crate::config::Timeouts;
use crate::core::{Grouping, Namespace};
use crate::domain::{HistoryEvent, HistoryEventKind};

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Library apps arrcoon can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum App {
    /// Episodic content
    Sonarr,

    /// Single-file content
    Radarr,
}

impl App {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sonarr => "Sonarr",
            Self::Radarr => "Radarr",
        }
    }

    /// Index partition for this app
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Sonarr => Namespace::Sonarr,
            Self::Radarr => Namespace::Radarr,
        }
    }

    /// How this app's history is reconciled
    pub fn grouping(&self) -> Grouping {
        match self {
            Self::Sonarr => Grouping::BySubItem,
            Self::Radarr => Grouping::Single,
        }
    }
}

impl std::fmt::Display for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Library API failures
#[derive(Debug, Error)]
pub enum ArrError {
    #[error("Invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("API token contains characters not allowed in a header")]
    InvalidToken,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response ({status}): {body}")]
    Status { status: StatusCode, body: String },
}

/// Response of `GET /api`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    pub current: String,
}

#[derive(Debug, Deserialize)]
struct ItemRecord {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeHistoryRecord {
    episode_id: i64,
    #[serde(default)]
    download_id: Option<String>,
    date: DateTime<Utc>,
    event_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieHistoryRecord {
    movie_id: i64,
    #[serde(default)]
    download_id: Option<String>,
    date: DateTime<Utc>,
    event_type: String,
}

impl From<EpisodeHistoryRecord> for HistoryEvent {
    fn from(record: EpisodeHistoryRecord) -> Self {
        HistoryEvent::new(
            record.episode_id,
            record.download_id.unwrap_or_default(),
            record.date,
            HistoryEventKind::from_api(&record.event_type),
        )
    }
}

impl From<MovieHistoryRecord> for HistoryEvent {
    fn from(record: MovieHistoryRecord) -> Self {
        HistoryEvent::new(
            record.movie_id,
            record.download_id.unwrap_or_default(),
            record.date,
            HistoryEventKind::from_api(&record.event_type),
        )
    }
}

/// REST client bound to one library app instance
#[derive(Debug, Clone)]
pub struct ArrClient {
    app: App,
    base: Url,
    client: reqwest::Client,
}

impl ArrClient {
    /// Create a new client for `host` authenticated with `token`
    pub fn new(app: App, host: &str, token: &str, timeouts: &Timeouts) -> Result<Self, ArrError> {
        let base = base_url(host).map_err(|source| ArrError::InvalidUrl {
            url: host.to_string(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(token).map_err(|_| ArrError::InvalidToken)?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        let client = http_client(timeouts).default_headers(headers).build()?;

        Ok(Self { app, base, client })
    }

    pub fn app(&self) -> App {
        self.app
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ArrError> {
        let url = self.base.join(path).map_err(|source| ArrError::InvalidUrl {
            url: format!("{}{}", self.base, path),
            source,
        })?;

        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArrError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    /// Check the API, returning its current version
    pub async fn api_info(&self) -> Result<ApiInfo, ArrError> {
        let info: ApiInfo = self.get("api", &[]).await?;
        info!(app = %self.app, version = %info.current, "Connected to library API");
        Ok(info)
    }

    /// Ids of every series or movie in the library
    pub async fn item_ids(&self) -> Result<Vec<i64>, ArrError> {
        let items: Vec<ItemRecord> = match self.app {
            App::Sonarr => {
                self.get(
                    "api/v3/series",
                    &[("includeSeasonImages", "false".to_string())],
                )
                .await?
            }
            App::Radarr => {
                self.get(
                    "api/v3/movie",
                    &[("excludeLocalCovers", "true".to_string())],
                )
                .await?
            }
        };

        let ids: Vec<i64> = items.into_iter().map(|item| item.id).collect();
        info!(app = %self.app, ids = ?ids, "Library items listed");
        Ok(ids)
    }

    /// Full history of one series or movie, in whatever order the API returns it
    pub async fn history(&self, item_id: i64) -> Result<Vec<HistoryEvent>, ArrError> {
        let events: Vec<HistoryEvent> = match self.app {
            App::Sonarr => {
                let records: Vec<EpisodeHistoryRecord> = self
                    .get(
                        "api/v3/history/series",
                        &[
                            ("seriesId", item_id.to_string()),
                            ("includeSeries", "false".to_string()),
                            ("includeEpisode", "false".to_string()),
                        ],
                    )
                    .await?;
                records.into_iter().map(HistoryEvent::from).collect()
            }
            App::Radarr => {
                let records: Vec<MovieHistoryRecord> = self
                    .get(
                        "api/v3/history/movie",
                        &[
                            ("movieId", item_id.to_string()),
                            ("includeMovie", "false".to_string()),
                        ],
                    )
                    .await?;
                records.into_iter().map(HistoryEvent::from).collect()
            }
        };

        debug!(app = %self.app, item_id, entries = events.len(), "History fetched");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(app: App, server: &MockServer) -> ArrClient {
        ArrClient::new(app, &server.base_url(), "testtoken", &Timeouts::default()).unwrap()
    }

    #[tokio::test]
    async fn test_api_info_sends_key() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api").header(API_KEY_HEADER, "testtoken");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"current": "v3"}));
        });

        let info = client(App::Sonarr, &server).api_info().await.unwrap();
        assert_eq!(info.current, "v3");
        mock.assert();
    }

    #[tokio::test]
    async fn test_api_info_surfaces_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(401).body("Unauthorized");
        });

        let err = client(App::Radarr, &server).api_info().await.unwrap_err();
        assert!(matches!(err, ArrError::Status { status, .. } if status == StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_series_history_is_normalised() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/history/series")
                .query_param("seriesId", "85")
                .query_param("includeSeries", "false")
                .query_param("includeEpisode", "false");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {
                        "episodeId": 3752,
                        "downloadId": "BBBBB4F4132C4AC7031F5692F36AC77A2ECBCCBB",
                        "date": "2024-03-01T10:00:00Z",
                        "eventType": "downloadFolderImported"
                    },
                    {
                        "episodeId": 3753,
                        "date": "2024-03-02T10:00:00Z",
                        "eventType": "episodeFileDeleted"
                    },
                    {
                        "episodeId": 3753,
                        "downloadId": null,
                        "date": "2024-03-02T11:00:00Z",
                        "eventType": "grabbed"
                    }
                ]));
        });

        let history = client(App::Sonarr, &server).history(85).await.unwrap();
        mock.assert();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].sub_item_id, 3752);
        assert_eq!(history[0].kind, HistoryEventKind::Imported);
        assert_eq!(history[1].kind, HistoryEventKind::Deleted);
        assert_eq!(history[1].download_id, "");
        assert_eq!(history[2].kind, HistoryEventKind::Other);
    }

    #[tokio::test]
    async fn test_movie_listing() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/movie")
                .query_param("excludeLocalCovers", "true");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([{"id": 1, "title": "A"}, {"id": 5, "title": "B"}]));
        });

        let ids = client(App::Radarr, &server).item_ids().await.unwrap();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_app_strategy() {
        assert_eq!(App::Sonarr.namespace(), Namespace::Sonarr);
        assert_eq!(App::Sonarr.grouping(), Grouping::BySubItem);
        assert_eq!(App::Radarr.namespace(), Namespace::Radarr);
        assert_eq!(App::Radarr.grouping(), Grouping::Single);
    }
}
