/// Core data types for the catchment reconciliation service.
///
/// This module defines the shared domain model imported by all other modules:
/// sites, canonical parameters, observations, aligned pairs and alerts, plus
/// the per-row and per-pair error types. It contains no I/O.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// A monitoring site in the catchment.
///
/// Metadata for each site (names, station codes, coordinates, alarm
/// configuration) lives in `sites::SITE_REGISTRY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    KangarooCreek,
    LittleColibanRiver,
    FiveMileCreekSite1,
    FiveMileCreekSite2,
}

impl Site {
    pub const ALL: [Site; 4] = [
        Site::KangarooCreek,
        Site::LittleColibanRiver,
        Site::FiveMileCreekSite1,
        Site::FiveMileCreekSite2,
    ];

    /// Display name used in source data and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Site::KangarooCreek => "Kangaroo Creek",
            Site::LittleColibanRiver => "Little Coliban River",
            Site::FiveMileCreekSite1 => "Five Mile Creek - Site 1",
            Site::FiveMileCreekSite2 => "Five Mile Creek - Site 2",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Canonical measurement parameter.
///
/// Source-specific names are mapped onto these by
/// `parameters::resolve_parameter_alias`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Turbidity,
    Nitrate,
    Nitrite,
    Phosphate,
    Conductivity,
    Chloride,
    Fluoride,
    Sulphate,
    Oxygen,
    Ph,
    Temperature,
    EnclosureTemperature,
    Rainfall,
    Streamflow,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Turbidity => "Turbidity",
            Parameter::Nitrate => "Nitrate",
            Parameter::Nitrite => "Nitrite",
            Parameter::Phosphate => "Phosphate",
            Parameter::Conductivity => "Conductivity",
            Parameter::Chloride => "Chloride",
            Parameter::Fluoride => "Fluoride",
            Parameter::Sulphate => "Sulphate",
            Parameter::Oxygen => "Oxygen",
            Parameter::Ph => "pH",
            Parameter::Temperature => "Temperature",
            Parameter::EnclosureTemperature => "Enclosure Temperature",
            Parameter::Rainfall => "Rainfall",
            Parameter::Streamflow => "Streamflow",
        }
    }

    /// Unit every observation of this parameter is expressed in after
    /// normalization.
    pub fn canonical_unit(&self) -> &'static str {
        match self {
            Parameter::Turbidity => "NTU",
            Parameter::Conductivity => "uS/cm",
            Parameter::Ph => "pH",
            Parameter::Temperature | Parameter::EnclosureTemperature => "degC",
            Parameter::Rainfall => "mm",
            Parameter::Streamflow => "ML/day",
            _ => "mg/L",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// The channel an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Automated continuous monitoring (EcoDetection sensors, rain and flow gauges).
    Sensor,
    /// Periodic certified lab sampling.
    Lab,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Sensor => write!(f, "Sensor"),
            Source::Lab => write!(f, "Lab"),
        }
    }
}

/// One measured value in canonical form.
///
/// Time of day is not modelled. Several observations may share
/// `(site, parameter, source, timestamp)`; they are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub site: Site,
    pub parameter: Parameter,
    pub timestamp: NaiveDate,
    pub value: f64,
    pub source: Source,
}

/// One gauge reading as exported, keyed by station rather than site. A
/// station may serve several sites, or none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationReading {
    pub station: u32,
    pub date: NaiveDate,
    pub value: f64,
}

/// A sensor and a lab observation sharing site, parameter and date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPair {
    pub sensor: Observation,
    pub lab: Observation,
}

impl AlignedPair {
    pub fn site(&self) -> Site {
        self.sensor.site
    }

    pub fn parameter(&self) -> Parameter {
        self.sensor.parameter
    }

    pub fn date(&self) -> NaiveDate {
        self.sensor.timestamp
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// The fixed set of alert kinds raised by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    TurbidityExceedance,
    RainfallExceedance,
    EcoLabMismatch,
}

impl AlertKind {
    /// The ceiling alert raised for observations of `parameter`, if any.
    pub fn for_parameter(parameter: Parameter) -> Option<AlertKind> {
        match parameter {
            Parameter::Turbidity => Some(AlertKind::TurbidityExceedance),
            Parameter::Rainfall => Some(AlertKind::RainfallExceedance),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::TurbidityExceedance => write!(f, "Turbidity exceedance"),
            AlertKind::RainfallExceedance => write!(f, "Rainfall exceedance"),
            AlertKind::EcoLabMismatch => write!(f, "EcoDetection vs Lab mismatch"),
        }
    }
}

/// Alert severity levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Critical once the observed value overshoots the threshold by at least
    /// the threshold's own magnitude.
    pub fn classify(observed: f64, threshold: f64) -> AlertSeverity {
        if observed - threshold >= threshold.abs() {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A threshold breach. Created by the evaluator and never mutated afterwards.
///
/// For `EcoLabMismatch` the observed value is the percentage difference
/// between sensor and lab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub site: Site,
    pub parameter: Parameter,
    pub timestamp: NaiveDate,
    pub observed_value: f64,
    pub threshold: f64,
    pub severity: AlertSeverity,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reasons a raw row is excluded from the canonical stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    /// The date field parses neither as a serial day count nor a date string.
    #[error("malformed timestamp: '{0}'")]
    MalformedTimestamp(String),
    /// The measurement name has no alias mapping for its source.
    #[error("unknown parameter: '{0}'")]
    UnknownParameter(String),
    /// The location, subsite code or station number maps to no site.
    #[error("unknown site: '{0}'")]
    UnknownSite(String),
    /// The result column is empty or not a number.
    #[error("missing value in column '{0}'")]
    MissingValue(&'static str),
}

/// Per-pair or per-series evaluation failures. Recovered by the evaluator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("division by zero: lab value is 0")]
    DivisionByZero,
    #[error("insufficient sample size: {0} observations, need at least 4")]
    InsufficientSampleSize(usize),
}
