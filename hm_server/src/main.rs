//! Harmony mobile pairing server.
//!
//! Bridges a desktop-authenticated dashboard session to a new mobile
//! client: the desktop registers a short-lived connection code, the mobile
//! app exchanges it exactly once for a long-lived bearer token.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use harmony::pairing::{CodeRegistry, DesktopTokenVerifier, TokenManager, sweeper};
use hm_server::api::{self, AppState, rate_limiter::ConnectRateLimiter};
use hm_server::{config::ServerConfig, logging, metrics};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the Harmony mobile pairing server

USAGE:
  hm_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:4000]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:4000)
  API_URL                      Public base URL handed to paired mobile clients
  MOBILE_JWT_SECRET            Mobile token signing secret
  DESKTOP_JWT_SECRET           Desktop identity token verification secret
  DESKTOP_TOKEN_ISSUER         Expected issuer of desktop identity tokens
  PAIRING_DEFAULT_TTL_SECS     Default connection code TTL
  PAIRING_MAX_TTL_SECS         Maximum connection code TTL
  PAIRING_SWEEP_INTERVAL_SECS  Expiry sweeper interval
  CONNECT_RATE_LIMIT           Redemption attempts allowed per address per window
  CONNECT_RATE_WINDOW_SECS     Redemption rate limit window
  METRICS_BIND                 Optional Prometheus exporter bind address
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let config = Arc::new(ServerConfig::from_env(bind_override)?);
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics exporter listening on {addr}");
    }

    let registry = CodeRegistry::new();
    let tokens = Arc::new(TokenManager::new(config.security.mobile_jwt_secret.clone()));
    let desktop_tokens = Arc::new(DesktopTokenVerifier::new(
        config.security.desktop_jwt_secret.clone(),
        config.security.desktop_token_issuer.clone(),
    ));
    let connect_limiter = Arc::new(ConnectRateLimiter::new(
        config.pairing.connect_rate_limit,
        Duration::from_secs(config.pairing.connect_rate_window_secs),
    ));

    let sweeper_handle = sweeper::spawn(
        registry.clone(),
        Duration::from_secs(config.pairing.sweep_interval_secs),
    );
    info!(
        "Code sweeper running every {}s",
        config.pairing.sweep_interval_secs
    );

    let state = AppState {
        registry,
        tokens,
        desktop_tokens,
        connect_limiter,
        config: config.clone(),
    };
    let app = api::create_router(state);

    info!("Starting pairing server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down, stopping code sweeper...");
    sweeper_handle.stop().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
