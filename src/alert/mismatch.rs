//! Sensor vs lab mismatch detection.

use crate::logging::{self, DataSource};
use crate::model::{Alert, AlertKind, AlertSeverity, AlignedPair, EvalError, Parameter, Site};
use chrono::NaiveDate;
use serde::Serialize;

/// Absolute difference between sensor and lab, as a percentage of lab.
pub fn mismatch_pct(pair: &AlignedPair) -> Result<f64, EvalError> {
    let lab = pair.lab.value;
    if lab == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok((pair.sensor.value - lab).abs() / lab * 100.0)
}

/// One `EcoLabMismatch` alert per pair whose percentage exceeds
/// `pct_threshold`. Pairs with a zero lab value are skipped.
pub fn flag_mismatch<'a>(
    pairs: impl IntoIterator<Item = &'a AlignedPair>,
    pct_threshold: f64,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for pair in pairs {
        match mismatch_pct(pair) {
            Ok(pct) if pct > pct_threshold => alerts.push(Alert {
                kind: AlertKind::EcoLabMismatch,
                site: pair.site(),
                parameter: pair.parameter(),
                timestamp: pair.date(),
                observed_value: pct,
                threshold: pct_threshold,
                severity: AlertSeverity::classify(pct, pct_threshold),
            }),
            Ok(_) => {}
            Err(e) => logging::debug(
                DataSource::Engine,
                Some(pair.site()),
                &format!("Skipping {} pair on {}: {}", pair.parameter(), pair.date(), e),
            ),
        }
    }
    alerts
}

/// Side-by-side view of one aligned pair, used by the compare listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairComparison {
    pub site: Site,
    pub parameter: Parameter,
    pub date: NaiveDate,
    pub sensor_value: f64,
    pub lab_value: f64,
    /// `None` when the lab value is zero.
    pub difference_pct: Option<f64>,
    pub exceeds: bool,
}

pub fn compare_pairs<'a>(
    pairs: impl IntoIterator<Item = &'a AlignedPair>,
    pct_threshold: f64,
) -> Vec<PairComparison> {
    pairs
        .into_iter()
        .map(|pair| {
            let difference_pct = mismatch_pct(pair).ok();
            PairComparison {
                site: pair.site(),
                parameter: pair.parameter(),
                date: pair.date(),
                sensor_value: pair.sensor.value,
                lab_value: pair.lab.value,
                difference_pct,
                exceeds: difference_pct.is_some_and(|pct| pct > pct_threshold),
            }
        })
        .collect()
}
