//! Site overview.
//!
//! Everything the evaluation knows about one site: its sensor readings
//! grouped by parameter family, the tail of its rainfall and streamflow
//! records, its alerts and its data gaps.

use crate::alert::{Evaluation, GapKind};
use crate::analysis::filter::most_recent;
use crate::model::{Alert, AlertSeverity, Observation, Site};
use crate::parameters::{ParameterGroup, group_of};
use serde::Serialize;
use std::collections::BTreeMap;

/// Gauge readings kept per site when no limit is given.
pub const DEFAULT_RECENT_READINGS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReadings {
    pub group: ParameterGroup,
    /// Chronological.
    pub readings: Vec<Observation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteOverview {
    pub site: Site,
    pub status: Option<AlertSeverity>,
    /// Groups with at least one reading, in `ParameterGroup` order.
    pub groups: Vec<GroupReadings>,
    pub rainfall: Vec<Observation>,
    pub streamflow: Vec<Observation>,
    pub alerts: Vec<Alert>,
    pub gaps: Vec<GapKind>,
}

fn at_site(observations: &[Observation], site: Site) -> Vec<Observation> {
    observations.iter().filter(|o| o.site == site).cloned().collect()
}

/// Overview of `site` within an evaluation. Gauge series keep their
/// `recent` latest readings.
pub fn site_overview(evaluation: &Evaluation, site: Site, recent: usize) -> SiteOverview {
    let mut groups: BTreeMap<ParameterGroup, Vec<Observation>> = BTreeMap::new();
    for annotated in evaluation.observations.iter().filter(|a| a.observation.site == site) {
        groups
            .entry(group_of(annotated.observation.parameter))
            .or_default()
            .push(annotated.observation.clone());
    }

    SiteOverview {
        site,
        status: evaluation.site_status(site),
        groups: groups
            .into_iter()
            .map(|(group, mut readings)| {
                readings.sort_by_key(|o| o.timestamp);
                GroupReadings { group, readings }
            })
            .collect(),
        rainfall: most_recent(&at_site(&evaluation.rainfall, site), recent),
        streamflow: most_recent(&at_site(&evaluation.streamflow, site), recent),
        alerts: evaluation.alerts_for(site).cloned().collect(),
        gaps: evaluation.gaps_for(site),
    }
}
