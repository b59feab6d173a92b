//! Documentation of a tabletop dice rolling service.
//!
//!
//!
//! # General Infrastructure
//! - Browser client rolls dice locally and talks JSON to this server
//! - Server owns two collections: a user's quick rolls and the roll history
//! - Documents live in Redis, or in process memory with `STORE_URL=memory://`
//! - No authentication, the `userId` query parameter is trusted as-is
//!
//!
//!
//! # Quick Rolls
//!
//! **Goal**: Named dice presets per user, rendered as an ordered palette.
//!
//! - Every preset carries an `order` position, dense from 0 within its owner
//! - Creation appends at `max(order) + 1`, or 0 for a new owner
//! - Deleting a preset shifts every later preset of the owner down by one
//! - All mutations of one owner run under a per-owner lock so concurrent
//!   creates never hand out the same position
//! - Updates and deletes check ownership, a non-owner gets a 403
//!
//!
//!
//! # Roll History
//!
//! - Saving takes a base notation (`XdY`), the individual faces and a total
//! - The total may include a bonus, so it is not checked against the faces
//! - History is returned newest first, optionally filtered by owner
//! - Clearing is by owner or, without one, everything
//!
//!
//!
//! # Notes
//!
//! ## Status codes
//! Validation, malformed ids and unknown records are all 400. Clients branch on
//! 400 vs. 403 vs. 500 only, so "not found" is deliberately not a 404.
//!
//! ## Error bodies
//! Every failure is `{ "success": false, "error": "..." }`. Internal failures add
//! a `details` field outside of production.
//!
//!
//!
//! # Setup
//!
//! Run against an in-memory store.
//! ```sh
//! STORE_URL=memory:// RUST_LOG=info cargo run -p rollbook
//! ```
//!
//! Run against Redis.
//! ```sh
//! STORE_URL=redis://localhost:6379 cargo run -p rollbook
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{delete, get, post, put},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod history;
pub mod locks;
pub mod quick_rolls;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    clear_rolls, create_quick_roll, delete_quick_roll, health, list_quick_rolls, roll_history,
    save_roll, update_quick_roll,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/quick-rolls", get(list_quick_rolls).post(create_quick_roll))
        .route(
            "/quick-rolls/{id}",
            put(update_quick_roll).delete(delete_quick_roll),
        )
        .route("/rolls/history", get(roll_history))
        .route("/rolls/save", post(save_roll))
        .route("/rolls/clear", delete(clear_rolls))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;
    error::expose_details(!config.environment.is_production());

    info!("Initializing state...");
    let state = AppState::new(config).context("Failed to initialize store")?;

    // The store connects lazily, an unreachable one only degrades requests.
    if let Err(e) = state.store.ping().await {
        warn!("Store is not reachable yet: {e}");
    }

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    state.store.teardown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
