//! HTTP handlers

pub mod health;
pub mod monitoring;
pub mod predict;
