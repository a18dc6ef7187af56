use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weather_core::{Config, FetchError, RecordStore, WeatherProvider, provider_from_config};

use crate::app::{self, AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-web", version, about = "Weather history web app")]
pub struct Cli {
    /// Path to a TOML config file. Defaults to the platform config directory.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port; overrides `PORT` and the config file.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        dotenv::dotenv().ok();

        let mut config = Config::load(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.port = port;
        }

        init_logging(&config);
        info!(profile = %config.profile, version = env!("CARGO_PKG_VERSION"), "Starting weather-web");

        // A broken store is fatal; nothing below works without it.
        let store = RecordStore::open(&config.database_file).with_context(|| {
            format!("Failed to open database: {}", config.database_file.display())
        })?;
        store.initialize().context("Database initialization failed")?;
        if config.uses_in_memory_database() {
            warn!("Using an in-memory database; observations are lost on exit");
        }

        std::fs::create_dir_all(&config.static_dir).with_context(|| {
            format!("Failed to create static directory: {}", config.static_dir.display())
        })?;

        let provider: Option<Arc<dyn WeatherProvider>> = match provider_from_config(&config) {
            Ok(provider) => Some(Arc::from(provider)),
            Err(FetchError::NotConfigured) => {
                warn!("OPENWEATHER_API_KEY is not set; city submissions will be rejected");
                None
            }
            Err(err) => return Err(err).context("Failed to build weather provider client"),
        };

        let addr = SocketAddr::new(self.host, config.port);
        let state = AppState::new(config, store, provider).context("Failed to load templates")?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(%addr, "Listening");

        axum::serve(listener, app::router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.profile.default_log_filter()));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from(["weather-web", "--config", "app.toml", "--port", "8080", "--host", "127.0.0.1"]);

        assert_eq!(cli.config, Some(PathBuf::from("app.toml")));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn defaults_bind_all_interfaces() {
        let cli = Cli::parse_from(["weather-web"]);

        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
        assert!(cli.host.is_unspecified());
    }
}
