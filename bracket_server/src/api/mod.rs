//! HTTP API for tournament brackets.
//!
//! # Modules
//!
//! - [`brackets`]: Team registration, bracket generation, results and the bracket view
//! - [`request_id`]: Request correlation middleware
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                     - Health check
//! POST   /api/v1/tournaments/{tournament_id}/teams   - Register a team
//! POST   /api/v1/tournaments/{tournament_id}/bracket - Generate the bracket
//! GET    /api/v1/tournaments/{tournament_id}/bracket - Current bracket
//! DELETE /api/v1/tournaments/{tournament_id}/bracket - Discard the bracket
//! POST   /api/v1/brackets                            - Generate several tournaments
//! PUT    /api/v1/matches/{match_id}/scores           - Update a running score
//! POST   /api/v1/matches/{match_id}/result           - Record a result
//! POST   /api/v1/matches/{match_id}/repropagate      - Re-advance a played match's winner
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_engine::{BracketService, EngineConfig, db::InMemoryStore};
//! use bracket_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let service = BracketService::new(
//!     Arc::new(store.clone()),
//!     Arc::new(store),
//!     EngineConfig::default(),
//! );
//!
//! let app = create_router(AppState { service });
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use bracket_engine::BracketService;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the service only holds `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub service: BracketService,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tournaments/{tournament_id}/teams",
            post(brackets::register_team),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            post(brackets::generate_bracket)
                .get(brackets::get_bracket)
                .delete(brackets::discard_bracket),
        )
        .route("/brackets", post(brackets::generate_all))
        .route("/matches/{match_id}/scores", put(brackets::update_scores))
        .route("/matches/{match_id}/result", post(brackets::record_result))
        .route(
            "/matches/{match_id}/repropagate",
            post(brackets::repropagate),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the match store answers, `503 Service Unavailable`
/// otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":true,"version":"0.1.0","timestamp":"2026-03-02T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.service.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            false
        }
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
