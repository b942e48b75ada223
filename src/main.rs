//! arrcoon CLI entrypoint

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arrcoon::cli::Cli;
use arrcoon::config::{self, paths};

/// Filter precedence: RUST_LOG, then the configured level, then info
fn env_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing(home: &Path, configured: Option<&str>) {
    let log_path = paths::log_file(home);
    let file = log_path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&log_path));

    let (file_layer, file_error) = match file {
        Ok(file) => (
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(env_filter(configured))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        error!(path = %log_path.display(), error = %e, "Couldn't open log file, logging to stderr only");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = paths::home_dir(cli.home.clone())?;
    let config_path = paths::config_path(&home, cli.config.clone());

    // Logging needs the configured level, so the config is read first
    let config = config::load(&config_path);
    init_tracing(
        &home,
        config.as_ref().ok().and_then(|c| c.log_level.as_deref()),
    );
    info!(home = %home.display(), "arrcoon starting");

    let config = config.map_err(|e| {
        error!(error = %e, "Couldn't load config");
        e
    })?;

    cli.execute(&home, &config).await.map_err(|e| {
        error!(error = %e, "arrcoon failed");
        e
    })
}
