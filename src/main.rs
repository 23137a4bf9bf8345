//! WrldBldr Combat - session host for tabletop combat
//!
//! The server:
//! - Hosts game sessions and their authoritative combat state
//! - Serves DM and player clients over WebSocket
//! - Accepts DM action batches from external producers over REST

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wrldbldr_combat::infrastructure::config::AppConfig;
use wrldbldr_combat::infrastructure::http;
use wrldbldr_combat::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wrldbldr_combat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WrldBldr Combat");

    let config = AppConfig::load()?;
    let addr = config.socket_addr()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Max batch size: {}", config.max_batch_size);
    tracing::info!("  Require approval: {}", config.require_approval);
    if let Some(seed) = config.dice_seed {
        tracing::info!("  Dice seed: {}", seed);
    }

    let state = Arc::new(AppState::new(config)?);
    tracing::info!(
        "Application state initialized ({} creature templates)",
        state.catalog.names().len()
    );

    let app = http::create_app(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
