//! Row selection helpers: date range, parameter set and most recent tail.

use crate::model::{Observation, Parameter, Site};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive date range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateRange { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// True when `from` is after `to`, which selects nothing.
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}

pub fn filter_parameters(observations: &[Observation], parameters: &[Parameter]) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| parameters.contains(&o.parameter))
        .cloned()
        .collect()
}

/// The `n` most recent observations, in chronological order. Ties on date
/// keep input order.
pub fn most_recent(observations: &[Observation], n: usize) -> Vec<Observation> {
    let mut sorted = observations.to_vec();
    sorted.sort_by_key(|o| o.timestamp);
    let skip = sorted.len().saturating_sub(n);
    sorted.split_off(skip)
}

/// Indices of `observations` grouped into `(site, parameter)` series.
pub fn series_indices(observations: &[Observation]) -> BTreeMap<(Site, Parameter), Vec<usize>> {
    let mut series: BTreeMap<(Site, Parameter), Vec<usize>> = BTreeMap::new();
    for (i, o) in observations.iter().enumerate() {
        series.entry((o.site, o.parameter)).or_default().push(i);
    }
    series
}
