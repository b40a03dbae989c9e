/*
 * Webauthn RP reference server.
 *
 * Drives registration and authentication ceremonies for a browser client, storing users
 * and their credentials in memory.
 */

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[macro_use]
extern crate tracing;

mod auth;
mod error;
mod startup;
mod store;

use crate::startup::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    debug!(?config);

    // Create the app
    let app_state = AppState::new(&config)?;

    let app = auth::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("unable to bind {}", config.bind))?;

    info!("listening on http://{}", config.bind);

    axum::serve(listener, app).await.context("server failed")?;

    Ok(())
}
