//! Prediction endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::features::WastewaterReading;
use crate::service::{round2, BodStatus};
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(rename = "prediction_mg_L")]
    pub prediction_mg_l: f64,
    pub status: BodStatus,
    pub latency_ms: f64,
}

/// Serve one BOD prediction from a raw sensor reading
pub async fn predict(
    State(state): State<AppState>,
    Json(reading): Json<WastewaterReading>,
) -> AppResult<Json<PredictResponse>> {
    let result = state.service.predict(&reading)?;

    Ok(Json(PredictResponse {
        prediction_mg_l: round2(result.value_mg_l),
        status: result.status,
        latency_ms: round2(result.latency_ms),
    }))
}
