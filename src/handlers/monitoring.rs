//! Monitoring stats handler
//!
//! Pull-based read path over the same store the prediction path appends
//! to; it never touches the prediction service itself.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::monitor;
use crate::AppState;

/// Rolling drift and performance metrics for the dashboard
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    match monitor::report(state.store.as_ref(), state.config.monitoring_window) {
        Ok(Some(snapshot)) => Json(json!(snapshot)),
        Ok(None) => Json(json!({ "message": "No data logged yet." })),
        Err(AppError::Aggregation(msg)) => {
            tracing::error!("Monitoring aggregation failed: {}", msg);
            Json(json!({ "error": msg }))
        }
        Err(e) => {
            tracing::error!("Monitoring read failed: {:?}", e);
            Json(json!({ "error": "monitoring read failed" }))
        }
    }
}
