//! Ceiling threshold checking.
//!
//! Thresholds are supplied per call; nothing here keeps state between
//! evaluations. `ThresholdConfig` is the session-scoped set of bounds the
//! user adjusts.

use crate::error::{CatchmentError, CatchmentResult};
use crate::model::{Alert, AlertKind, AlertSeverity, Observation};
use crate::sites;
use serde::{Deserialize, Serialize};

/// Numeric bound per alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Turbidity ceiling in NTU.
    pub turbidity_ntu: f64,
    /// Daily rainfall ceiling in mm.
    pub rainfall_mm: f64,
    /// Sensor vs lab difference ceiling, as a percentage of the lab value.
    pub mismatch_pct: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            turbidity_ntu: 10.0,
            rainfall_mm: 20.0,
            mismatch_pct: sites::DEFAULT_SENSITIVITY,
        }
    }
}

/// Thresholds must be finite and non-negative.
pub fn validate_threshold(kind: AlertKind, value: f64) -> CatchmentResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CatchmentError::InvalidThreshold { kind, value })
    }
}

impl ThresholdConfig {
    pub fn get(&self, kind: AlertKind) -> f64 {
        match kind {
            AlertKind::TurbidityExceedance => self.turbidity_ntu,
            AlertKind::RainfallExceedance => self.rainfall_mm,
            AlertKind::EcoLabMismatch => self.mismatch_pct,
        }
    }

    pub fn set(&mut self, kind: AlertKind, value: f64) -> CatchmentResult<()> {
        let value = validate_threshold(kind, value)?;
        match kind {
            AlertKind::TurbidityExceedance => self.turbidity_ntu = value,
            AlertKind::RainfallExceedance => self.rainfall_mm = value,
            AlertKind::EcoLabMismatch => self.mismatch_pct = value,
        }
        Ok(())
    }

    pub fn validate(&self) -> CatchmentResult<()> {
        for kind in [
            AlertKind::TurbidityExceedance,
            AlertKind::RainfallExceedance,
            AlertKind::EcoLabMismatch,
        ] {
            validate_threshold(kind, self.get(kind))?;
        }
        Ok(())
    }
}

/// Checks one observation against a ceiling.
///
/// Returns `None` when the value is at or below the threshold, or when the
/// observation's parameter has no ceiling alert.
pub fn check_ceiling(observation: &Observation, threshold: f64) -> Option<Alert> {
    let kind = AlertKind::for_parameter(observation.parameter)?;
    if observation.value > threshold {
        Some(Alert {
            kind,
            site: observation.site,
            parameter: observation.parameter,
            timestamp: observation.timestamp,
            observed_value: observation.value,
            threshold,
            severity: AlertSeverity::classify(observation.value, threshold),
        })
    } else {
        None
    }
}

/// One alert per observation strictly above `threshold`, in input order.
pub fn flag_ceiling_exceedance(observations: &[Observation], threshold: f64) -> Vec<Alert> {
    observations
        .iter()
        .filter_map(|o| check_ceiling(o, threshold))
        .collect()
}
