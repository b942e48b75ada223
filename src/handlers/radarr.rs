//! Radarr events.

use tracing::{debug, info};

use super::{parse_id, EventHandler, HandlerError};
use crate::adapters::App;

/// Raw event fields as Radarr exports them
#[derive(Debug, Default, Clone, Copy)]
pub struct RadarrFields<'a> {
    pub movie_id: Option<&'a str>,
    pub download_id: Option<&'a str>,
    pub movie_title: Option<&'a str>,
}

/// A Radarr event with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadarrEvent {
    Test,
    Grab {
        movie_id: i64,
        download_id: String,
        movie_title: Option<String>,
    },
    Download { movie_id: i64 },
    MovieDelete { movie_id: i64 },
    Other(String),
}

impl RadarrEvent {
    pub fn parse(event_type: &str, fields: RadarrFields<'_>) -> Result<Self, HandlerError> {
        let movie_id = || parse_id(App::Radarr, "radarr_movie_id", fields.movie_id);

        let event = match event_type {
            "Test" => Self::Test,
            "Grab" => Self::Grab {
                movie_id: movie_id()?,
                download_id: fields.download_id.unwrap_or_default().trim().to_string(),
                movie_title: fields.movie_title.map(str::to_string),
            },
            "Download" => Self::Download {
                movie_id: movie_id()?,
            },
            "MovieDelete" => Self::MovieDelete {
                movie_id: movie_id()?,
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
                movie_id,
                download_id,
                movie_title,
            } => {
                debug!(
                    movie_id,
                    movie_title = movie_title.as_deref().unwrap_or_default(),
                    download_id = %download_id,
                    "Handling Grab event"
                );
                handler.grab(movie_id, &download_id).await;
            }
            Self::Download { movie_id } => {
                debug!(movie_id, "Handling Download event");
                handler.import(movie_id).await;
            }
            Self::MovieDelete { movie_id } => {
                debug!(movie_id, "Handling MovieDelete event");
                handler.delete_item(movie_id).await;
            }
            Self::Other(name) => {
                info!(event = %name, "Ignoring Radarr event type");
            }
        }
        Ok(())
    }
}
