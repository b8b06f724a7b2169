//! Wastewater BOD Soft-Sensor Server
//!
//! Serves an offline-trained BOD regression model over HTTP with
//! per-request audit logging and rolling drift statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    BOD SOFT SENSOR                         │
//! ├────────────────────────────────────────────────────────────┤
//! │  POST /predict ─► encode ─► model ─► expm1 ─► classify     │
//! │                                 │                          │
//! │                                 ▼  (fire-and-forget)       │
//! │                       append-only CSV log                  │
//! │                                 ▲                          │
//! │  GET /monitoring/stats ─────────┘  rolling window + drift  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Training, dataset cleaning, and hyperparameter selection happen
//! offline; this crate only loads the exported artifact and serves it.

pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod model;
pub mod monitor;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<service::PredictionService>,
    pub store: Arc<dyn store::LogStore>,
    pub config: config::Config,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/monitoring/stats", get(handlers::monitoring::stats))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
