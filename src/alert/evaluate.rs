//! One evaluation pass over a dataset snapshot.
//!
//! `evaluate` selects the session's sites and dates, annotates IQR outliers,
//! aligns sensor against lab, and raises ceiling and mismatch alerts. It reads
//! the dataset and the session and changes neither.

use crate::alert::mismatch::flag_mismatch;
use crate::alert::outliers::flag_outliers_iqr;
use crate::alert::thresholds::flag_ceiling_exceedance;
use crate::analysis::align::{AlignOutcome, Alignment, align};
use crate::analysis::filter::{filter_parameters, series_indices};
use crate::ingest::Dataset;
use crate::logging::{self, DataSource};
use crate::model::{Alert, AlertSeverity, Observation, Parameter, Site};
use crate::session::SessionContext;
use crate::sites::site_info;
use serde::Serialize;

/// A selected sensor observation and whether it is an outlier in its
/// `(site, parameter)` series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedObservation {
    #[serde(flatten)]
    pub observation: Observation,
    pub outlier: bool,
}

/// Input data missing for a requested site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum GapKind {
    NoSensorData,
    LabDataUnavailable,
    /// The site has no rainfall gauge assigned.
    NoRainfallStation,
    /// The site's rainfall gauge reported nothing in the window.
    NoRainfallData,
    /// The site's streamflow gauge reported nothing in the window.
    NoStreamflowData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataGap {
    pub site: Site,
    pub gap: GapKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub observations: Vec<AnnotatedObservation>,
    pub rainfall: Vec<Observation>,
    pub streamflow: Vec<Observation>,
    pub alignment: Alignment,
    /// Most recent first.
    pub alerts: Vec<Alert>,
    pub gaps: Vec<DataGap>,
}

impl Evaluation {
    /// Highest severity among the site's alerts, `None` when it has none.
    pub fn site_status(&self, site: Site) -> Option<AlertSeverity> {
        self.alerts
            .iter()
            .filter(|a| a.site == site)
            .map(|a| a.severity)
            .max()
    }

    pub fn alerts_for(&self, site: Site) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(move |a| a.site == site)
    }

    pub fn gaps_for(&self, site: Site) -> Vec<GapKind> {
        self.gaps
            .iter()
            .filter(|g| g.site == site)
            .map(|g| g.gap)
            .collect()
    }

    pub fn outlier_count(&self) -> usize {
        self.observations.iter().filter(|o| o.outlier).count()
    }
}

fn select(session: &SessionContext, observations: &[Observation]) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| session.includes(o))
        .cloned()
        .collect()
}

fn annotate_outliers(sensor: Vec<Observation>) -> Vec<AnnotatedObservation> {
    let mut outlier = vec![false; sensor.len()];
    for ((site, parameter), indices) in series_indices(&sensor) {
        let series: Vec<Observation> = indices.iter().map(|&i| sensor[i].clone()).collect();
        let flagged = flag_outliers_iqr(&series);
        if !flagged.is_empty() {
            logging::debug(
                DataSource::Engine,
                Some(site),
                &format!("{} of {} {} readings are outliers", flagged.len(), series.len(), parameter),
            );
        }
        for pos in flagged {
            outlier[indices[pos]] = true;
        }
    }
    sensor
        .into_iter()
        .zip(outlier)
        .map(|(observation, outlier)| AnnotatedObservation { observation, outlier })
        .collect()
}

fn find_gaps(
    site: Site,
    sensor: &[AnnotatedObservation],
    lab: &[Observation],
    rainfall: &[Observation],
    streamflow: &[Observation],
) -> Vec<DataGap> {
    let mut gaps = Vec::new();
    let mut push = |gap| gaps.push(DataGap { site, gap });

    if !sensor.iter().any(|o| o.observation.site == site) {
        push(GapKind::NoSensorData);
    }
    if !lab.iter().any(|o| o.site == site) {
        push(GapKind::LabDataUnavailable);
    }
    if site_info(site).rainfall_station.is_none() {
        push(GapKind::NoRainfallStation);
    } else if !rainfall.iter().any(|o| o.site == site) {
        push(GapKind::NoRainfallData);
    }
    if !streamflow.iter().any(|o| o.site == site) {
        push(GapKind::NoStreamflowData);
    }
    gaps
}

/// Runs the full evaluation for one session.
pub fn evaluate(session: &SessionContext, dataset: &Dataset) -> Evaluation {
    if session.date_range.is_inverted() {
        logging::warn(
            DataSource::Engine,
            None,
            "Date range starts after it ends; nothing will be selected",
        );
    }

    let observations = annotate_outliers(select(session, &dataset.sensor));
    let lab = select(session, &dataset.lab);
    let rainfall = select(session, &dataset.rainfall);
    let streamflow = select(session, &dataset.streamflow);

    let sensor: Vec<Observation> = observations.iter().map(|a| a.observation.clone()).collect();
    let comparable: Vec<Observation> = if session.hide_outliers {
        observations
            .iter()
            .filter(|a| !a.outlier)
            .map(|a| a.observation.clone())
            .collect()
    } else {
        sensor.clone()
    };
    let alignment = align(&comparable, &lab);

    let mut alerts = flag_ceiling_exceedance(
        &filter_parameters(&sensor, &[Parameter::Turbidity]),
        session.thresholds.turbidity_ntu,
    );
    alerts.extend(flag_ceiling_exceedance(
        &filter_parameters(&rainfall, &[Parameter::Rainfall]),
        session.thresholds.rainfall_mm,
    ));
    for site_alignment in &alignment.sites {
        if let AlignOutcome::Paired(pairs) = &site_alignment.outcome {
            alerts.extend(flag_mismatch(pairs, session.mismatch_threshold(site_alignment.site)));
        }
    }
    alerts.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(a.kind.cmp(&b.kind))
            .then(a.site.cmp(&b.site))
    });

    let mut requested: Vec<Site> = Vec::new();
    for site in &session.sites {
        if !requested.contains(site) {
            requested.push(*site);
        }
    }
    let gaps: Vec<DataGap> = requested
        .iter()
        .flat_map(|site| find_gaps(*site, &observations, &lab, &rainfall, &streamflow))
        .collect();

    for site in &requested {
        if let Some(severity) = alerts.iter().filter(|a| a.site == *site).map(|a| a.severity).max() {
            let count = alerts.iter().filter(|a| a.site == *site).count();
            logging::info(
                DataSource::Engine,
                Some(*site),
                &format!("{} alert(s), highest severity {}", count, severity),
            );
        }
    }

    Evaluation {
        observations,
        rainfall,
        streamflow,
        alignment,
        alerts,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::filter::DateRange;
    use crate::model::{AlertKind, Source};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn obs(site: Site, parameter: Parameter, day: u32, value: f64, source: Source) -> Observation {
        Observation {
            site,
            parameter,
            timestamp: date(day),
            value,
            source,
        }
    }

    fn turbidity_series(site: Site, values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| obs(site, Parameter::Turbidity, 1 + i as u32, *v, Source::Sensor))
            .collect()
    }

    #[test]
    fn test_raises_all_three_alert_kinds_newest_first() {
        let dataset = Dataset {
            sensor: vec![
                obs(Site::LittleColibanRiver, Parameter::Turbidity, 3, 12.0, Source::Sensor),
                obs(Site::LittleColibanRiver, Parameter::Nitrate, 1, 0.9, Source::Sensor),
            ],
            lab: vec![obs(Site::LittleColibanRiver, Parameter::Nitrate, 1, 0.3, Source::Lab)],
            rainfall: vec![obs(Site::LittleColibanRiver, Parameter::Rainfall, 2, 25.0, Source::Sensor)],
            ..Default::default()
        };
        let eval = evaluate(&SessionContext::default(), &dataset);

        let kinds: Vec<_> = eval.alerts.iter().map(|a| (a.kind, a.timestamp)).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertKind::TurbidityExceedance, date(3)),
                (AlertKind::RainfallExceedance, date(2)),
                (AlertKind::EcoLabMismatch, date(1)),
            ]
        );
        assert_eq!(eval.site_status(Site::LittleColibanRiver), Some(AlertSeverity::Critical));
        assert_eq!(eval.site_status(Site::KangarooCreek), None);
    }

    #[test]
    fn test_session_selection_limits_alerts() {
        let dataset = Dataset {
            sensor: vec![
                obs(Site::KangarooCreek, Parameter::Turbidity, 1, 50.0, Source::Sensor),
                obs(Site::KangarooCreek, Parameter::Turbidity, 20, 50.0, Source::Sensor),
                obs(Site::FiveMileCreekSite1, Parameter::Turbidity, 1, 50.0, Source::Sensor),
            ],
            ..Default::default()
        };
        let session = SessionContext::default()
            .with_sites(vec![Site::KangarooCreek])
            .with_date_range(DateRange::new(Some(date(1)), Some(date(10))));
        let eval = evaluate(&session, &dataset);

        assert_eq!(eval.alerts.len(), 1);
        assert_eq!(eval.alerts[0].site, Site::KangarooCreek);
        assert_eq!(eval.alerts[0].timestamp, date(1));
        assert_eq!(eval.observations.len(), 1);
    }

    #[test]
    fn test_outliers_annotated_per_series() {
        let mut sensor = turbidity_series(Site::KangarooCreek, &[1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 100.0]);
        // A separate short series is never flagged.
        sensor.extend(turbidity_series(Site::LittleColibanRiver, &[1.0, 1.0, 100.0]));
        let dataset = Dataset {
            sensor,
            ..Default::default()
        };
        let eval = evaluate(&SessionContext::default(), &dataset);

        assert_eq!(eval.outlier_count(), 1);
        assert!(eval.observations[8].outlier);
        assert_eq!(eval.observations[8].observation.value, 100.0);
    }

    #[test]
    fn test_hide_outliers_removes_them_from_comparison_only() {
        let sensor = turbidity_series(Site::KangarooCreek, &[1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 100.0]);
        let dataset = Dataset {
            sensor,
            lab: vec![obs(Site::KangarooCreek, Parameter::Turbidity, 9, 4.0, Source::Lab)],
            ..Default::default()
        };

        let shown = evaluate(&SessionContext::default(), &dataset);
        assert_eq!(shown.alignment.pairs().count(), 1);
        assert!(shown.alerts.iter().any(|a| a.kind == AlertKind::EcoLabMismatch));

        let session = SessionContext {
            hide_outliers: true,
            ..Default::default()
        };
        let hidden = evaluate(&session, &dataset);
        assert_eq!(hidden.alignment.pairs().count(), 0);
        assert!(hidden.alerts.iter().all(|a| a.kind != AlertKind::EcoLabMismatch));
        assert!(
            hidden.alerts.iter().any(|a| a.kind == AlertKind::TurbidityExceedance),
            "ceiling checks still see outlier readings"
        );
    }

    #[test]
    fn test_per_site_sensitivity_applies_to_mismatch() {
        let dataset = Dataset {
            sensor: vec![obs(Site::KangarooCreek, Parameter::Nitrate, 1, 1.6, Source::Sensor)],
            lab: vec![obs(Site::KangarooCreek, Parameter::Nitrate, 1, 1.0, Source::Lab)],
            ..Default::default()
        };
        assert_eq!(evaluate(&SessionContext::default(), &dataset).alerts.len(), 1);

        let mut session = SessionContext::default();
        session.set_sensitivity(Site::KangarooCreek, 75.0).unwrap();
        assert!(evaluate(&session, &dataset).alerts.is_empty());
    }

    #[test]
    fn test_gaps_are_reported_per_requested_site() {
        let dataset = Dataset {
            sensor: vec![obs(Site::FiveMileCreekSite1, Parameter::Turbidity, 1, 1.0, Source::Sensor)],
            rainfall: vec![obs(Site::FiveMileCreekSite1, Parameter::Rainfall, 1, 1.0, Source::Sensor)],
            streamflow: vec![obs(Site::FiveMileCreekSite1, Parameter::Streamflow, 1, 9.0, Source::Sensor)],
            ..Default::default()
        };
        let session = SessionContext::default().with_sites(vec![
            Site::FiveMileCreekSite1,
            Site::KangarooCreek,
            Site::FiveMileCreekSite1,
        ]);
        let eval = evaluate(&session, &dataset);

        assert_eq!(eval.gaps_for(Site::FiveMileCreekSite1), vec![GapKind::LabDataUnavailable]);
        assert_eq!(
            eval.gaps_for(Site::KangarooCreek),
            vec![
                GapKind::NoSensorData,
                GapKind::LabDataUnavailable,
                GapKind::NoRainfallStation,
                GapKind::NoStreamflowData,
            ]
        );
        assert_eq!(eval.gaps.len(), 5, "duplicate site requests report gaps once");
        assert!(eval.alignment.is_lab_unavailable(Site::FiveMileCreekSite1));
    }

    #[test]
    fn test_empty_dataset_evaluates_cleanly() {
        let eval = evaluate(&SessionContext::default(), &Dataset::default());
        assert!(eval.alerts.is_empty());
        assert!(eval.observations.is_empty());
        assert_eq!(
            eval.gaps_for(Site::LittleColibanRiver),
            vec![
                GapKind::NoSensorData,
                GapKind::LabDataUnavailable,
                GapKind::NoRainfallData,
                GapKind::NoStreamflowData,
            ]
        );
    }

    #[test]
    fn test_streamflow_gap_follows_the_date_window() {
        let dataset = Dataset {
            streamflow: vec![obs(Site::KangarooCreek, Parameter::Streamflow, 5, 3.2, Source::Sensor)],
            ..Default::default()
        };
        let session = SessionContext::default().with_sites(vec![Site::KangarooCreek]);
        let in_window = evaluate(&session, &dataset);
        assert!(!in_window.gaps_for(Site::KangarooCreek).contains(&GapKind::NoStreamflowData));
        assert_eq!(in_window.streamflow.len(), 1);

        let later = session.with_date_range(DateRange::new(Some(date(6)), None));
        let eval = evaluate(&later, &dataset);
        assert!(eval.gaps_for(Site::KangarooCreek).contains(&GapKind::NoStreamflowData));
    }
}
