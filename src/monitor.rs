//! Monitoring aggregation over the prediction log
//!
//! Computes rolling latency and input statistics for the dashboard and a
//! conductivity-threshold drift flag. The drift check is deliberately a
//! crude fixed-threshold heuristic (rising influent salinity as a proxy for
//! input distribution change), not a statistical drift test.

use serde::Serialize;

use crate::error::AppError;
use crate::service::round2;
use crate::store::LogStore;

/// Default rolling window, in requests
pub const DEFAULT_WINDOW: usize = 50;

/// Window mean conductivity at or above this flags drift (uS/cm)
pub const CONDUCTIVITY_DRIFT_THRESHOLD: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriftStatus {
    Stable,
    #[serde(rename = "DRIFT DETECTED: High Salinity")]
    DriftDetected,
}

/// Rolling snapshot of recent serving traffic. Recomputed fresh on every
/// read, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringReport {
    /// Count of every request ever logged, not just the window
    pub total_requests: usize,
    pub avg_latency_ms: f64,
    pub avg_input_cod: f64,
    pub avg_input_conductivity: f64,
    pub drift_status: DriftStatus,
}

/// Aggregate the most recent `window` records, or `None` when nothing has
/// been logged yet.
pub fn report(store: &dyn LogStore, window: usize) -> Result<Option<MonitoringReport>, AppError> {
    let (total, recent) = store
        .read_tail(window)
        .map_err(|e| AppError::Aggregation(e.to_string()))?;

    if total == 0 {
        return Ok(None);
    }

    let count = recent.len() as f64;
    let mut latency_sum = 0.0;
    let mut cod_sum = 0.0;
    let mut conductivity_sum = 0.0;
    for record in &recent {
        latency_sum += record.latency_ms;
        cod_sum += record.cod;
        conductivity_sum += record.conductivity;
    }

    let avg_conductivity = conductivity_sum / count;
    let drift_status = if avg_conductivity < CONDUCTIVITY_DRIFT_THRESHOLD {
        DriftStatus::Stable
    } else {
        DriftStatus::DriftDetected
    };

    Ok(Some(MonitoringReport {
        total_requests: total,
        avg_latency_ms: round2(latency_sum / count),
        avg_input_cod: round2(cod_sum / count),
        avg_input_conductivity: round2(avg_conductivity),
        drift_status,
    }))
}
