//! Command-line interface for arrcoon.
//!
//! arrcoon is invoked as a custom script by Sonarr and Radarr, which pass the
//! event through environment variables (`sonarr_eventtype`, `radarr_movie_id`,
//! ...). Every one of them can also be given as a flag for manual runs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info};

use crate::adapters::{self, App, ArrClient, TorrentClient};
use crate::config::{paths, ResolvedConfig};
use crate::core::IndexStore;
use crate::handlers::radarr::RadarrFields;
use crate::handlers::sonarr::SonarrFields;
use crate::handlers::{self, EventHandler, HandlerError, RadarrEvent, SonarrEvent};

/// Self-test selector for `arrcoon_eventtype`
pub const TEST_TORRENT_CLIENT: &str = "test_torrent_client";

/// arrcoon - removes torrents whose files Sonarr/Radarr no longer use
#[derive(Parser, Debug)]
#[command(name = "arrcoon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding config.yml, logs/ and .index/ (defaults to the binary's directory)
    #[arg(long, env = "ARRCOON_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Config file (defaults to <home>/config.yml)
    #[arg(long, env = "ARRCOON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub event: EventArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show resolved configuration (debug)
    Config,
}

/// Event selectors and payloads, normally exported by the library apps
#[derive(Args, Debug, Default, Clone)]
pub struct EventArgs {
    /// arrcoon's own event (`test_torrent_client`)
    #[arg(long = "arrcoon-eventtype", env = "arrcoon_eventtype")]
    pub arrcoon_event: Option<String>,

    #[command(flatten)]
    pub sonarr: SonarrArgs,

    #[command(flatten)]
    pub radarr: RadarrArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SonarrArgs {
    #[arg(id = "sonarr_eventtype", long = "sonarr-eventtype", env = "sonarr_eventtype")]
    pub event_type: Option<String>,

    #[arg(id = "sonarr_series_id", long = "sonarr-series-id", env = "sonarr_series_id")]
    pub series_id: Option<String>,

    #[arg(id = "sonarr_download_id", long = "sonarr-download-id", env = "sonarr_download_id")]
    pub download_id: Option<String>,

    #[arg(id = "sonarr_series_title", long = "sonarr-series-title", env = "sonarr_series_title")]
    pub series_title: Option<String>,

    #[arg(id = "sonarr_episodefile_id", long = "sonarr-episodefile-id", env = "sonarr_episodefile_id")]
    pub episode_file_id: Option<String>,

    /// Comma-separated episode ids of a deleted file
    #[arg(
        id = "sonarr_episodefile_episodeids",
        long = "sonarr-episodefile-episodeids",
        env = "sonarr_episodefile_episodeids"
    )]
    pub episode_ids: Option<String>,
}

impl SonarrArgs {
    fn fields(&self) -> SonarrFields<'_> {
        SonarrFields {
            series_id: non_empty(&self.series_id),
            download_id: non_empty(&self.download_id),
            series_title: non_empty(&self.series_title),
            episode_file_id: non_empty(&self.episode_file_id),
            episode_ids: non_empty(&self.episode_ids),
        }
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct RadarrArgs {
    #[arg(id = "radarr_eventtype", long = "radarr-eventtype", env = "radarr_eventtype")]
    pub event_type: Option<String>,

    #[arg(id = "radarr_movie_id", long = "radarr-movie-id", env = "radarr_movie_id")]
    pub movie_id: Option<String>,

    #[arg(id = "radarr_download_id", long = "radarr-download-id", env = "radarr_download_id")]
    pub download_id: Option<String>,

    #[arg(id = "radarr_movie_title", long = "radarr-movie-title", env = "radarr_movie_title")]
    pub movie_title: Option<String>,
}

impl RadarrArgs {
    fn fields(&self) -> RadarrFields<'_> {
        RadarrFields {
            movie_id: non_empty(&self.movie_id),
            download_id: non_empty(&self.download_id),
            movie_title: non_empty(&self.movie_title),
        }
    }
}

/// Which event this invocation carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    /// arrcoon's own event; wins over everything else
    Arrcoon(&'a str),
    /// A library app event
    Library(App, &'a str),
    None,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl EventArgs {
    /// Dispatch order: arrcoon, then Sonarr, then Radarr
    pub fn selection(&self) -> Selection<'_> {
        if let Some(event) = non_empty(&self.arrcoon_event) {
            Selection::Arrcoon(event)
        } else if let Some(event) = non_empty(&self.sonarr.event_type) {
            Selection::Library(App::Sonarr, event)
        } else if let Some(event) = non_empty(&self.radarr.event_type) {
            Selection::Library(App::Radarr, event)
        } else {
            Selection::None
        }
    }

    /// Handle the selected event
    pub async fn dispatch(&self, home: &Path, config: &ResolvedConfig) -> Result<()> {
        let torrents = adapters::connect(config.client_kind, &config.client, &config.timeouts)?;

        let (app, event_type) = match self.selection() {
            Selection::Arrcoon(TEST_TORRENT_CLIENT) => {
                handlers::test_torrent_client(torrents.as_ref()).await?;
                return Ok(());
            }
            Selection::Arrcoon(other) => {
                info!(event = other, "Unknown arrcoon event type");
                return Ok(());
            }
            Selection::Library(app, event_type) => (app, event_type),
            Selection::None => bail!("Neither Sonarr nor Radarr event found"),
        };
        debug!(app = %app, event = event_type, "Event received");

        if event_type == "Test" {
            info!(
                app = %app,
                client = %config.client_kind,
                config = %config.config_file.display(),
                "Running connectivity test"
            );
            handlers::test_torrent_client(torrents.as_ref()).await?;
        }

        match app {
            App::Sonarr => {
                let Some(event) = accept(SonarrEvent::parse(event_type, self.sonarr.fields()))? else {
                    return Ok(());
                };
                let handler = event_handler(app, home, config, torrents.as_ref())?;
                event.handle(&handler).await?;
            }
            App::Radarr => {
                let Some(event) = accept(RadarrEvent::parse(event_type, self.radarr.fields()))? else {
                    return Ok(());
                };
                let handler = event_handler(app, home, config, torrents.as_ref())?;
                event.handle(&handler).await?;
            }
        }
        Ok(())
    }
}

/// Malformed payloads are logged and dropped; everything else propagates
fn accept<T>(parsed: Result<T, HandlerError>) -> Result<Option<T>, HandlerError> {
    match parsed {
        Ok(event) => Ok(Some(event)),
        Err(e) if !e.is_fatal() => {
            error!(error = %e, "Ignoring event");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn event_handler<'a>(
    app: App,
    home: &Path,
    config: &ResolvedConfig,
    torrents: &'a dyn TorrentClient,
) -> Result<EventHandler<'a>> {
    let arr = config.arr(app)?;
    let api = ArrClient::new(app, &arr.host, &arr.token, &config.timeouts)?;
    Ok(EventHandler::new(api, torrents, IndexStore::new(home)))
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self, home: &Path, config: &ResolvedConfig) -> Result<()> {
        match self.command {
            Some(Commands::Config) => show_config(home, config),
            None => self.event.dispatch(home, config).await,
        }
    }
}

/// Show the resolved configuration (for debugging); tokens are not printed
fn show_config(home: &Path, config: &ResolvedConfig) -> Result<()> {
    println!("arrcoon configuration");
    println!();
    println!("Config file: {}", config.config_file.display());
    println!();
    println!("Paths:");
    println!("  Home:  {}", home.display());
    println!("  Index: {}", paths::index_dir(home).display());
    println!("  Log:   {}", paths::log_file(home).display());
    println!();
    println!("Library apps:");
    for app in [App::Sonarr, App::Radarr] {
        match config.arr(app) {
            Ok(arr) => println!("  {}: {}", app, arr.host),
            Err(_) => println!("  {}: (not configured)", app),
        }
    }
    println!();
    println!("Torrent client: {}", config.client_kind);
    println!();
    println!("Timeouts:");
    println!("  Connect: {}s", config.timeouts.connect_secs);
    println!("  Request: {}s", config.timeouts.request_secs);
    println!();
    println!(
        "Log level: {}",
        config.log_level.as_deref().unwrap_or("info (default)")
    );

    Ok(())
}
