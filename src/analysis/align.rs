//! Sensor/lab alignment.
//!
//! Pairs every sensor observation with the lab observations taken at the
//! same site, for the same parameter, on the same calendar date. The join is
//! exact: a lab sample taken the day after a sensor reading is not paired
//! with it. Duplicate keys produce every combination.

use crate::model::{AlignedPair, Observation, Parameter, Site};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlignOutcome {
    Paired(Vec<AlignedPair>),
    /// The site has sensor data but no lab observations at all, so no
    /// comparison is possible. Distinct from `Paired(vec![])`, which means
    /// lab data exists but no dates coincide.
    LabUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteAlignment {
    pub site: Site,
    pub outcome: AlignOutcome,
}

/// Alignment result, one entry per site present in either input, ordered by
/// site.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Alignment {
    pub sites: Vec<SiteAlignment>,
}

impl Alignment {
    /// All pairs across every paired site, in site order.
    pub fn pairs(&self) -> impl Iterator<Item = &AlignedPair> {
        self.sites.iter().flat_map(|s| match &s.outcome {
            AlignOutcome::Paired(pairs) => pairs.as_slice(),
            AlignOutcome::LabUnavailable => &[][..],
        })
    }

    /// Pairs for one site; `None` when the site is absent or has no lab data.
    pub fn pairs_for(&self, site: Site) -> Option<&[AlignedPair]> {
        self.sites
            .iter()
            .find(|s| s.site == site)
            .and_then(|s| match &s.outcome {
                AlignOutcome::Paired(pairs) => Some(pairs.as_slice()),
                AlignOutcome::LabUnavailable => None,
            })
    }

    pub fn lab_unavailable(&self) -> Vec<Site> {
        self.sites
            .iter()
            .filter(|s| s.outcome == AlignOutcome::LabUnavailable)
            .map(|s| s.site)
            .collect()
    }

    pub fn is_lab_unavailable(&self, site: Site) -> bool {
        self.lab_unavailable().contains(&site)
    }
}

type JoinKey = (Site, Parameter, NaiveDate);

/// Inner-joins sensor and lab observations on `(site, parameter, date)`.
///
/// Pairs within a site follow sensor input order, then lab input order.
/// The result depends only on the inputs.
pub fn align(sensor: &[Observation], lab: &[Observation]) -> Alignment {
    let mut lab_index: HashMap<JoinKey, Vec<&Observation>> = HashMap::new();
    let mut lab_sites = BTreeSet::new();
    for obs in lab {
        lab_sites.insert(obs.site);
        lab_index
            .entry((obs.site, obs.parameter, obs.timestamp))
            .or_default()
            .push(obs);
    }

    let mut per_site: BTreeMap<Site, Vec<AlignedPair>> = BTreeMap::new();
    for obs in sensor {
        let pairs = per_site.entry(obs.site).or_default();
        if let Some(matches) = lab_index.get(&(obs.site, obs.parameter, obs.timestamp)) {
            pairs.extend(matches.iter().map(|lab_obs| AlignedPair {
                sensor: obs.clone(),
                lab: (*lab_obs).clone(),
            }));
        }
    }
    for site in &lab_sites {
        per_site.entry(*site).or_default();
    }

    Alignment {
        sites: per_site
            .into_iter()
            .map(|(site, pairs)| SiteAlignment {
                site,
                outcome: if lab_sites.contains(&site) {
                    AlignOutcome::Paired(pairs)
                } else {
                    AlignOutcome::LabUnavailable
                },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    fn obs(site: Site, parameter: Parameter, day: u32, value: f64, source: Source) -> Observation {
        Observation {
            site,
            parameter,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            value,
            source,
        }
    }

    fn sensor(site: Site, parameter: Parameter, day: u32, value: f64) -> Observation {
        obs(site, parameter, day, value, Source::Sensor)
    }

    fn lab(site: Site, parameter: Parameter, day: u32, value: f64) -> Observation {
        obs(site, parameter, day, value, Source::Lab)
    }

    #[test]
    fn test_pairs_on_exact_site_parameter_date() {
        let s = vec![
            sensor(Site::KangarooCreek, Parameter::Turbidity, 1, 5.0),
            sensor(Site::KangarooCreek, Parameter::Turbidity, 2, 6.0),
            sensor(Site::KangarooCreek, Parameter::Nitrate, 1, 0.4),
        ];
        let l = vec![lab(Site::KangarooCreek, Parameter::Turbidity, 1, 4.0)];

        let alignment = align(&s, &l);
        let pairs: Vec<_> = alignment.pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sensor.value, 5.0);
        assert_eq!(pairs[0].lab.value, 4.0);
    }

    #[test]
    fn test_adjacent_dates_are_not_paired() {
        let s = vec![sensor(Site::KangarooCreek, Parameter::Turbidity, 1, 5.0)];
        let l = vec![lab(Site::KangarooCreek, Parameter::Turbidity, 2, 4.0)];
        let alignment = align(&s, &l);
        assert_eq!(alignment.pairs().count(), 0);
        assert_eq!(alignment.pairs_for(Site::KangarooCreek), Some(&[][..]));
        assert!(!alignment.is_lab_unavailable(Site::KangarooCreek));
    }

    #[test]
    fn test_duplicates_yield_cross_product() {
        let s = vec![
            sensor(Site::LittleColibanRiver, Parameter::Nitrate, 3, 0.1),
            sensor(Site::LittleColibanRiver, Parameter::Nitrate, 3, 0.2),
        ];
        let l = vec![
            lab(Site::LittleColibanRiver, Parameter::Nitrate, 3, 1.0),
            lab(Site::LittleColibanRiver, Parameter::Nitrate, 3, 2.0),
            lab(Site::LittleColibanRiver, Parameter::Nitrate, 3, 3.0),
        ];
        let values: Vec<_> = align(&s, &l)
            .pairs()
            .map(|p| (p.sensor.value, p.lab.value))
            .collect();
        assert_eq!(
            values,
            vec![(0.1, 1.0), (0.1, 2.0), (0.1, 3.0), (0.2, 1.0), (0.2, 2.0), (0.2, 3.0)]
        );
    }

    #[test]
    fn test_alignment_is_restartable() {
        let s = vec![
            sensor(Site::LittleColibanRiver, Parameter::Nitrate, 3, 0.1),
            sensor(Site::KangarooCreek, Parameter::Turbidity, 3, 9.0),
            sensor(Site::LittleColibanRiver, Parameter::Nitrate, 3, 0.2),
        ];
        let l = vec![
            lab(Site::KangarooCreek, Parameter::Turbidity, 3, 7.0),
            lab(Site::LittleColibanRiver, Parameter::Nitrate, 3, 1.0),
        ];
        assert_eq!(align(&s, &l), align(&s, &l));
    }

    #[test]
    fn test_empty_lab_signals_unavailable_instead_of_empty_pairs() {
        let s = vec![sensor(Site::FiveMileCreekSite1, Parameter::Turbidity, 1, 5.0)];
        let alignment = align(&s, &[]);

        assert_eq!(alignment.pairs().count(), 0);
        assert!(alignment.is_lab_unavailable(Site::FiveMileCreekSite1));
        assert_eq!(alignment.pairs_for(Site::FiveMileCreekSite1), None);
        assert_eq!(
            alignment.sites,
            vec![SiteAlignment {
                site: Site::FiveMileCreekSite1,
                outcome: AlignOutcome::LabUnavailable,
            }]
        );
    }

    #[test]
    fn test_lab_unavailable_is_per_site() {
        let s = vec![
            sensor(Site::KangarooCreek, Parameter::Turbidity, 1, 5.0),
            sensor(Site::FiveMileCreekSite2, Parameter::Turbidity, 1, 5.0),
        ];
        let l = vec![lab(Site::KangarooCreek, Parameter::Turbidity, 1, 5.5)];
        let alignment = align(&s, &l);
        assert_eq!(alignment.lab_unavailable(), vec![Site::FiveMileCreekSite2]);
        assert_eq!(alignment.pairs().count(), 1);
    }

    #[test]
    fn test_no_inputs_no_sites() {
        assert_eq!(align(&[], &[]), Alignment::default());
    }
}
