//! HTTP health server.
//!
//! Minimal liveness surface beside the engine: one `/health` route
//! reporting the store id and uptime. Carries no storefront logic.

use axum::{extract::State, response::Json, routing::get, Router};
use boost_config::ApiConfig;
use serde_json::{json, Value};
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state for the health server.
#[derive(Clone)]
struct AppState {
	store_id: String,
	started_at: Instant,
}

/// Starts the health server.
pub async fn start_server(
	api_config: ApiConfig,
	store_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
	let state = AppState {
		store_id,
		started_at: Instant::now(),
	};

	let app = Router::new()
		.route("/health", get(handle_health))
		.layer(TraceLayer::new_for_http())
		.with_state(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Health server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"store": state.store_id,
		"uptime_seconds": state.started_at.elapsed().as_secs(),
	}))
}
