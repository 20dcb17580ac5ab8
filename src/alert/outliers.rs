/// Interquartile-range outlier detection.
///
/// Quartiles use linear interpolation between order statistics: for a
/// sorted sample of `n` values the `p` quantile sits at position
/// `p * (n - 1)`, interpolating between its floor and ceiling neighbours.
/// Values strictly below `Q1 - 1.5*IQR` or strictly above `Q3 + 1.5*IQR`
/// are outliers.
use crate::model::{EvalError, Observation};
use serde::Serialize;
use std::collections::BTreeSet;

pub const IQR_MULTIPLIER: f64 = 1.5;

/// Series shorter than this have no meaningful quartiles.
pub const MIN_SAMPLE_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Lower fence, `q1 - 1.5 * iqr`.
    pub lower: f64,
    /// Upper fence, `q3 + 1.5 * iqr`.
    pub upper: f64,
}

impl IqrBounds {
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Quantile of an ascending, non-empty slice.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Fences for `values`. Non-finite values are ignored.
pub fn iqr_bounds(values: &[f64]) -> Result<IqrBounds, EvalError> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.len() < MIN_SAMPLE_SIZE {
        return Err(EvalError::InsufficientSampleSize(sorted.len()));
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    Ok(IqrBounds {
        q1,
        q3,
        iqr,
        lower: q1 - IQR_MULTIPLIER * iqr,
        upper: q3 + IQR_MULTIPLIER * iqr,
    })
}

/// Indices of the outliers in `observations`, treated as one series.
///
/// Too-short series yield an empty set. Callers split by
/// `(site, parameter)` before calling.
pub fn flag_outliers_iqr(observations: &[Observation]) -> BTreeSet<usize> {
    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    match iqr_bounds(&values) {
        Ok(bounds) => observations
            .iter()
            .enumerate()
            .filter(|(_, o)| bounds.is_outlier(o.value))
            .map(|(i, _)| i)
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Parameter, Site, Source};
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation {
                site: Site::LittleColibanRiver,
                parameter: Parameter::Turbidity,
                timestamp: NaiveDate::from_ymd_opt(2024, 3, 1 + i as u32).unwrap(),
                value: *v,
                source: Source::Sensor,
            })
            .collect()
    }

    #[test]
    fn test_quartiles_interpolate_between_order_statistics() {
        let bounds = iqr_bounds(&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 100.0]).unwrap();
        assert_eq!(bounds.q1, 2.0);
        assert_eq!(bounds.q3, 4.0);
        assert_eq!(bounds.iqr, 2.0);
        assert_eq!(bounds.lower, -1.0);
        assert_eq!(bounds.upper, 7.0);
    }

    #[test]
    fn test_quantile_fractional_position() {
        // pos = 0.25 * 4 = 1.0 for five values; 0.75 * 3 = 2.25 for four.
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.25), 2.0);
        assert_eq!(quantile(&[10.0, 20.0, 30.0, 40.0], 0.75), 32.5);
    }

    #[test]
    fn test_single_extreme_value_is_the_only_outlier() {
        let obs = series(&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 100.0]);
        assert_eq!(flag_outliers_iqr(&obs), BTreeSet::from([8]));
    }

    #[test]
    fn test_fence_values_are_not_outliers() {
        // Fences for this sample are -1 and 7; both extremes sit exactly on them.
        let obs = series(&[-1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 7.0]);
        let bounds = iqr_bounds(&obs.iter().map(|o| o.value).collect::<Vec<_>>()).unwrap();
        assert!(!bounds.is_outlier(bounds.upper));
        assert!(!bounds.is_outlier(bounds.lower));
    }

    #[test]
    fn test_fewer_than_four_values_yields_empty_set() {
        let obs = series(&[1.0, 2.0, 500.0]);
        assert!(flag_outliers_iqr(&obs).is_empty());
        assert_eq!(
            iqr_bounds(&[1.0, 2.0, 500.0]),
            Err(EvalError::InsufficientSampleSize(3))
        );
    }

    #[test]
    fn test_non_finite_values_do_not_count_toward_sample() {
        assert_eq!(
            iqr_bounds(&[1.0, f64::NAN, 2.0, f64::INFINITY, 3.0]),
            Err(EvalError::InsufficientSampleSize(3))
        );
    }

    #[test]
    fn test_flat_series_has_no_outliers() {
        let obs = series(&[5.0; 10]);
        assert!(flag_outliers_iqr(&obs).is_empty());
    }
}
