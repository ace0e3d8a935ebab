#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the AIS map engine.
//!
//! Serves JSON views of selected AIS reports: enriched rows with their
//! colors, the map frame, vessel footprints and trajectories as `GeoJSON`,
//! and legends. Report selections are memoized per filter in a
//! [`SelectionCache`] shared by every worker.

pub mod config;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use ais_map_database::{PostgresStore, ReportStore, SelectionCache, run_migrations};

pub use config::{ConfigError, EngineConfig};
pub use handlers::{ServerError, configure};

/// Shared application state.
pub struct AppState {
    /// Backing AIS store.
    pub store: Arc<dyn ReportStore>,
    /// Report selections of the current visualization cycle.
    pub cache: SelectionCache,
    /// Engine tunables.
    pub config: EngineConfig,
}

/// Starts the AIS map API server.
///
/// Loads the engine config, connects to the `PostgreSQL` store, runs
/// migrations and starts the Actix-Web HTTP server. The caller provides
/// the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the config cannot be loaded, the
/// store cannot be reached or migrated, or the HTTP server fails to bind
/// or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = EngineConfig::load().map_err(|e| std::io::Error::other(e.to_string()))?;

    log::info!("Connecting to database...");
    let store = PostgresStore::connect_from_env()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    log::info!("Running migrations...");
    run_migrations(store.database())
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let state = web::Data::new(AppState {
        store: Arc::new(store),
        cache: SelectionCache::new(),
        config,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
