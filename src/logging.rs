/// Structured logging for the catchment reconciliation service.
///
/// Every message is tagged with the data source it concerns and, where
/// relevant, the monitoring site. Messages go through the `log` facade with
/// a per-source target (`catchment::sensor`, `catchment::lab`, ...) so they
/// can be filtered with `RUST_LOG`; the binary installs `pretty_env_logger`.
use crate::model::{RowError, Site, Source};
use crate::normalize::SkipTally;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Sensor,
    Lab,
    Rainfall,
    Streamflow,
    Engine,
    Config,
}

impl DataSource {
    fn target(&self) -> &'static str {
        match self {
            DataSource::Sensor => "catchment::sensor",
            DataSource::Lab => "catchment::lab",
            DataSource::Rainfall => "catchment::rainfall",
            DataSource::Streamflow => "catchment::streamflow",
            DataSource::Engine => "catchment::engine",
            DataSource::Config => "catchment::config",
        }
    }
}

/// Log target for rows of a measurement source.
impl From<Source> for DataSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Sensor => DataSource::Sensor,
            Source::Lab => DataSource::Lab,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Sensor => write!(f, "SENSOR"),
            DataSource::Lab => write!(f, "LAB"),
            DataSource::Rainfall => write!(f, "RAIN"),
            DataSource::Streamflow => write!(f, "FLOW"),
            DataSource::Engine => write!(f, "ENGINE"),
            DataSource::Config => write!(f, "CONFIG"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Routine exclusion - untracked measurement, other site, blank result
    Expected,
    /// Points at a data-quality problem in the export
    Unexpected,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
        }
    }
}

/// Classify why a row was dropped from the canonical stream.
pub fn classify_row_failure(err: &RowError) -> FailureType {
    match err {
        RowError::UnknownParameter(_) | RowError::UnknownSite(_) | RowError::MissingValue(_) => {
            FailureType::Expected
        }
        RowError::MalformedTimestamp(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Logger setup
// ---------------------------------------------------------------------------

/// Install the global logger. `RUST_LOG` filters, when set, are applied on
/// top of `min_level`. Calling this twice is harmless.
pub fn init_logger(min_level: LogLevel) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(min_level.into());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

fn emit(level: log::Level, source: DataSource, site: Option<Site>, message: &str) {
    match site {
        Some(site) => log::log!(target: source.target(), level, "{} [{}]: {}", source, site, message),
        None => log::log!(target: source.target(), level, "{}: {}", source, message),
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

pub fn debug(source: DataSource, site: Option<Site>, message: &str) {
    emit(log::Level::Debug, source, site, message);
}

pub fn info(source: DataSource, site: Option<Site>, message: &str) {
    emit(log::Level::Info, source, site, message);
}

pub fn warn(source: DataSource, site: Option<Site>, message: &str) {
    emit(log::Level::Warn, source, site, message);
}

pub fn error(source: DataSource, site: Option<Site>, message: &str) {
    emit(log::Level::Error, source, site, message);
}

/// Log a dropped row with automatic classification.
pub fn log_row_failure(source: DataSource, line: usize, err: &RowError) {
    let failure_type = classify_row_failure(err);
    let message = format!("row {} dropped [{}]: {}", line, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(source, None, &message),
        FailureType::Unexpected => warn(source, None, &message),
    }
}

// ---------------------------------------------------------------------------
// Normalization Summary Logging
// ---------------------------------------------------------------------------

/// Log how many rows of a collection made it into the canonical stream.
pub fn log_normalize_summary(source: DataSource, total: usize, kept: usize, skipped: &SkipTally) {
    let message = format!(
        "Normalized {}/{} rows ({} malformed timestamps, {} untracked parameters, {} unknown sites, {} missing values)",
        kept,
        total,
        skipped.malformed_timestamp,
        skipped.unknown_parameter,
        skipped.unknown_site,
        skipped.missing_value
    );

    if total > 0 && kept == 0 {
        error(source, None, &message);
    } else if skipped.malformed_timestamp > 0 {
        warn(source, None, &message);
    } else {
        info(source, None, &message);
    }
}
