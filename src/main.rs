#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use realm_server::config;
use realm_server::logging;
use realm_server::server::{InMemoryRealmStore, RealmServer, TrustingIdentityProvider};
use realm_server::websocket;

/// Coordination server for real-time multi-user virtual spaces.
#[derive(Parser, Debug)]
#[command(name = "realm-server")]
#[command(about = "Real-time session/room coordination and proximity pairing server")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file. Falls back to compiled defaults if absent.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Validate configuration and exit without starting the server.
    #[arg(long, conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let validation = config::validate(&cfg);
    if cli.validate_config {
        match validation {
            Ok(()) => {
                println!("Configuration validation passed");
                return Ok(());
            }
            Err(err) => {
                eprintln!("Configuration validation failed: {err}");
                std::process::exit(1);
            }
        }
    }
    if config::is_production_mode() {
        validation?;
    }

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "starting realm coordination server");

    let store = Arc::new(InMemoryRealmStore::new());
    let identity = Arc::new(TrustingIdentityProvider);
    let server = RealmServer::new(cfg.clone(), store, identity);

    let idle_sweep_server = server.clone();
    let mut expired = server.start_idle_sweep();
    tokio::spawn(async move {
        while let Some(socket_id) = expired.recv().await {
            idle_sweep_server.connections.remove(&socket_id);
            idle_sweep_server.metrics.record_connection_closed();
        }
    });

    let cors = if cfg.security.cors_origins.trim() == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cfg
            .security
            .allowed_origins()
            .into_iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        if origins.is_empty() {
            tracing::warn!("no valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let app = Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(server)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_handler(
    axum::extract::State(server): axum::extract::State<Arc<RealmServer>>,
) -> axum::Json<realm_server::server::MetricsSnapshot> {
    axum::Json(server.metrics.snapshot())
}
