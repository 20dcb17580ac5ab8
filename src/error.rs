use crate::model::AlertKind;
use std::path::PathBuf;

/// Failures that stop a load or a command outright. Per-row and per-pair
/// problems never surface here; see `model::RowError` and `model::EvalError`.
#[derive(thiserror::Error, Debug)]
pub enum CatchmentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid threshold for {kind}: {value} (must be finite and non-negative)")]
    InvalidThreshold { kind: AlertKind, value: f64 },
    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: String },
    #[error("unknown site '{0}'")]
    UnknownSite(String),
    #[error("report has no sections selected")]
    ReportEmpty,
    #[error("serde JSON error")]
    SerdeJson(#[from] serde_json::Error),
}

pub type CatchmentResult<T> = Result<T, CatchmentError>;
