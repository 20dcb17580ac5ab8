/// Per-session evaluation context.
///
/// Holds the user's current selection: which sites, which dates, which
/// thresholds, and per-site mismatch sensitivity. A `SessionContext` is
/// passed explicitly to `alert::evaluate`; two sessions never share state.
use crate::alert::thresholds::{ThresholdConfig, validate_threshold};
use crate::analysis::filter::DateRange;
use crate::config::CatchmentConfig;
use crate::error::{CatchmentError, CatchmentResult};
use crate::model::{AlertKind, Observation, Site};
use crate::sites::{find_site, site_info};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-invocation choices layered over the configured session, as given on
/// the command line. Unset fields leave the configured value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOverrides {
    /// Replaces the site selection when non-empty.
    pub sites: Vec<Site>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub turbidity_ntu: Option<f64>,
    pub rainfall_mm: Option<f64>,
    pub mismatch_pct: Option<f64>,
    /// Turns outlier hiding on; it cannot turn it off.
    pub hide_outliers: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    /// Sites to evaluate, in request order.
    pub sites: Vec<Site>,
    pub date_range: DateRange,
    pub thresholds: ThresholdConfig,
    /// Mismatch percentage overrides per site.
    pub site_sensitivity: BTreeMap<Site, f64>,
    /// Drop IQR outliers from the sensor series before comparing to lab.
    pub hide_outliers: bool,
}

impl Default for SessionContext {
    fn default() -> Self {
        SessionContext {
            sites: Site::ALL.to_vec(),
            date_range: DateRange::default(),
            thresholds: ThresholdConfig::default(),
            site_sensitivity: BTreeMap::new(),
            hide_outliers: false,
        }
    }
}

impl SessionContext {
    /// Session seeded from the configured thresholds, sensitivity overrides
    /// and default date window.
    pub fn from_config(config: &CatchmentConfig) -> CatchmentResult<Self> {
        config.thresholds.validate()?;
        let mut session = SessionContext {
            date_range: config.window,
            thresholds: config.thresholds,
            ..Default::default()
        };
        for (name, pct) in &config.sensitivity {
            let site = find_site(name).ok_or_else(|| CatchmentError::UnknownSite(name.clone()))?;
            session.set_sensitivity(site, *pct)?;
        }
        Ok(session)
    }

    pub fn with_sites(mut self, sites: Vec<Site>) -> Self {
        self.sites = sites;
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Applies `overrides` on top of this session. Each end of the date
    /// window is replaced independently, so `--from` alone keeps the
    /// configured end date. Invalid thresholds are rejected.
    pub fn with_overrides(mut self, overrides: &SessionOverrides) -> CatchmentResult<Self> {
        if !overrides.sites.is_empty() {
            self.sites = overrides.sites.clone();
        }
        let current = self.date_range;
        self.date_range = DateRange::new(
            overrides.from.or(current.from),
            overrides.to.or(current.to),
        );
        for (kind, value) in [
            (AlertKind::TurbidityExceedance, overrides.turbidity_ntu),
            (AlertKind::RainfallExceedance, overrides.rainfall_mm),
            (AlertKind::EcoLabMismatch, overrides.mismatch_pct),
        ] {
            if let Some(value) = value {
                self.set_threshold(kind, value)?;
            }
        }
        if overrides.hide_outliers {
            self.hide_outliers = true;
        }
        Ok(self)
    }

    pub fn set_threshold(&mut self, kind: AlertKind, value: f64) -> CatchmentResult<()> {
        self.thresholds.set(kind, value)
    }

    pub fn set_sensitivity(&mut self, site: Site, pct: f64) -> CatchmentResult<()> {
        let pct = validate_threshold(AlertKind::EcoLabMismatch, pct)?;
        self.site_sensitivity.insert(site, pct);
        Ok(())
    }

    /// True when the observation falls within the selected sites and dates.
    pub fn includes(&self, observation: &Observation) -> bool {
        self.sites.contains(&observation.site) && self.date_range.contains(observation.timestamp)
    }

    /// Mismatch threshold for `site`: the override if one is set, else the
    /// session-wide mismatch threshold.
    pub fn mismatch_threshold(&self, site: Site) -> f64 {
        self.site_sensitivity
            .get(&site)
            .copied()
            .unwrap_or(self.thresholds.mismatch_pct)
    }

    /// Sensitivity shown for a site's alarm: the override if set, else the
    /// registry default.
    pub fn sensitivity(&self, site: Site) -> f64 {
        self.site_sensitivity
            .get(&site)
            .copied()
            .unwrap_or(site_info(site).alarm.default_sensitivity)
    }
}
