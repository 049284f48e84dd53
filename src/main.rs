//! EduCanvas · Gamified Script Generator Backend
//!
//! - Axum HTTP + WebSocket API
//! - Optional Gemini integration (via environment variables)
//! - Optional Firestore persistence (in-memory store otherwise)
//!
//! Important env variables:
//!   PORT                 : u16 (default 8011)
//!   GEMINI_API_KEY       : enables generation if present
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL         : default "gemini-2.0-flash"
//!   FIREBASE_PROJECT_ID  : enables Firestore persistence if present
//!   FIRESTORE_BASE_URL   : default "https://firestore.googleapis.com/v1"
//!   FIRESTORE_AUTH_TOKEN : optional OAuth bearer sent to Firestore
//!   CANVAS_CONFIG_PATH   : path to TOML config (prompt overrides)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod catalog;
mod domain;
mod plan;
mod config;
mod prompt;
mod parse;
mod edit;
mod store;
mod firestore;
mod gemini;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (script store, Gemini client, prompts).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 8011.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8011)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "educanvas_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

async fn shutdown_signal() {
  let _ = tokio::signal::ctrl_c().await;
  info!(target: "educanvas_backend", "Shutdown signal received");
}
