//! EduParent · Roleplay Game Backend
//!
//! - Axum HTTP API for the parent-teen roleplay simulator
//! - Optional OpenAI integration (via environment variables); without it
//!   the agents serve deterministic fallbacks and the game stays playable
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables OpenAI integration if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   EVALUATION_MODEL    : default "gpt-4o-mini"
//!   TEEN_RESPONSE_MODEL : default "gpt-4o-mini"
//!   AGENT_CONFIG_PATH   : path to TOML config (prompt overrides)
//!   SCENARIOS_DIR       : directory of scenario TOML documents
//!   MAX_ATTEMPTS        : single-round attempt budget (default 3)
//!   MAX_ROUND_ATTEMPTS  : per-round attempt budget (default 3)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod locale;
mod model;
mod scenarios;
mod seeds;
mod config;
mod openai;
mod evaluator;
mod responder;
mod engine;
mod error;
mod state;
mod protocol;
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

  // Build shared application state (engine, session store, OpenAI client).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "eduparent_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
