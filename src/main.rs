// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Botnoi Key Portal Server
//!
//! Signs the user in with Google, then fetches and caches their Botnoi Voice
//! developer API key or sends them on to the workflow workspace.

use anyhow::Context;
use botnoi_key_portal::{
    config::Config,
    services::GoogleIdentity,
    store::{FileStore, KeyValueStore, MemoryStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Botnoi Key Portal");

    // Open local storage
    let store: Arc<dyn KeyValueStore> = match &config.storage_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Opening local storage");
            Arc::new(FileStore::open(path).context("Failed to open local storage")?)
        }
        None => {
            tracing::warn!("No storage path configured, state will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let identity =
        GoogleIdentity::new(&config).context("Failed to initialize Google identity provider")?;

    if let Some(timeout) = config.session_timeout {
        tracing::info!(timeout_secs = timeout.as_secs(), "Absolute session timeout enabled");
    }

    // Build shared state (restores a remembered session, hydrates the key cache)
    let state = Arc::new(AppState::build(config.clone(), store, identity).await);

    // Build router
    let app = botnoi_key_portal::routes::create_router(state);

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("botnoi_key_portal=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
