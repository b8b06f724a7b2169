//! Prediction service
//!
//! The serving pipeline: encode -> infer -> invert the log transform ->
//! classify -> record. One inference per request, no caching, no state
//! shared between requests apart from the log store.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::error::AppError;
use crate::features::{encode, WastewaterReading};
use crate::model::BodModel;
use crate::store::{LogRecord, LogStore};

/// Effluent BOD above this is flagged as a shock load (mg/L)
pub const SHOCK_LOAD_THRESHOLD_MG_L: f64 = 400.0;

/// Classification of a served prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodStatus {
    Normal,
    #[serde(rename = "Shock Load Warning")]
    ShockLoadWarning,
}

impl BodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodStatus::Normal => "Normal",
            BodStatus::ShockLoadWarning => "Shock Load Warning",
        }
    }
}

/// Classify an effluent-space BOD value. Strict `<`: a prediction exactly
/// at the threshold already counts as a shock load.
pub fn classify(value_mg_l: f64) -> BodStatus {
    if value_mg_l < SHOCK_LOAD_THRESHOLD_MG_L {
        BodStatus::Normal
    } else {
        BodStatus::ShockLoadWarning
    }
}

/// Round to two decimals for response bodies and the log store
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One completed prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub value_mg_l: f64,
    pub status: BodStatus,
    /// Wall time of the inference pipeline only, transport excluded
    pub latency_ms: f64,
}

/// Wraps the loaded model artifact and the prediction log
pub struct PredictionService {
    model: Arc<dyn BodModel>,
    store: Arc<dyn LogStore>,
}

impl PredictionService {
    pub fn new(model: Arc<dyn BodModel>, store: Arc<dyn LogStore>) -> Self {
        Self { model, store }
    }

    /// Serve one BOD prediction for a raw sensor reading.
    pub fn predict(&self, reading: &WastewaterReading) -> Result<PredictionResult, AppError> {
        let start = Instant::now();

        let features = encode(reading)?;
        let raw = self.model.predict(&features);
        // The regressor was fitted against log1p(BOD); invert back to mg/L.
        let value_mg_l = raw.exp_m1();
        let status = classify(value_mg_l);

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let record = LogRecord {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            latency_ms,
            flow: reading.flow,
            ph: reading.ph,
            conductivity: reading.conductivity,
            cod: reading.cod,
            prediction: value_mg_l,
            status: status.as_str().to_string(),
        };
        // A monitoring-store outage must never fail the prediction itself.
        if let Err(e) = self.store.append(&record) {
            tracing::error!("Failed to record prediction: {}", e);
        }

        Ok(PredictionResult {
            value_mg_l,
            status,
            latency_ms,
        })
    }
}
