//! Feature engineering for the BOD soft sensor
//!
//! The encoder must reproduce the trainer's feature engineering exactly:
//! same columns, same order, same cyclical month terms. `FEATURE_LAYOUT`
//! pins that order and the model loader rejects any artifact whose
//! training columns disagree with it.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::error::AppError;

/// Number of model input features
pub const FEATURE_COUNT: usize = 6;

/// Training-time column order. Must stay in lockstep with the offline
/// trainer's feature selection.
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "Q_E_Input_Flow",
    "PH_E_Input_pH",
    "COND_E_Input_Conductivity",
    "DQO_E_Input_COD",
    "sin_month",
    "cos_month",
];

/// One raw sensor reading, as posted to `/predict`
#[derive(Debug, Clone, Deserialize)]
pub struct WastewaterReading {
    /// Sample date, `YYYY-MM-DD`
    pub date: String,
    /// Input flow (Q_E)
    pub flow: f64,
    /// Input acidity (PH_E)
    pub ph: f64,
    /// Input conductivity (COND_E), dissolved-solids proxy
    pub conductivity: f64,
    /// Chemical Oxygen Demand (DQO_E), the BOD proxy sensor
    pub cod: f64,
}

/// Model input vector in `FEATURE_LAYOUT` order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Encode a raw reading into the model input vector.
///
/// Pure function of the reading: the four sensor values followed by
/// `sin(2π·month/12)` and `cos(2π·month/12)` with the month taken from
/// `date`. BOD loads swing between winter and summer, which is what the
/// cyclical terms capture.
pub fn encode(reading: &WastewaterReading) -> Result<FeatureVector, AppError> {
    let date = NaiveDate::parse_from_str(&reading.date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput("Invalid date format. Use YYYY-MM-DD".to_string()))?;

    let month = f64::from(date.month());
    let angle = 2.0 * std::f64::consts::PI * month / 12.0;

    Ok(FeatureVector([
        reading.flow,
        reading.ph,
        reading.conductivity,
        reading.cod,
        angle.sin(),
        angle.cos(),
    ]))
}
