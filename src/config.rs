/// Service configuration loaded from `catchment.toml`.
///
/// Every section is optional. A missing file falls back to the defaults;
/// a malformed one is an error.
///
/// ```toml
/// [data]
/// sensor = "data/ecodetection_clean_data.csv"
/// lab = "data/cw_catchment_sampling.csv"
///
/// [thresholds]
/// turbidity_ntu = 10.0
/// rainfall_mm = 20.0
/// mismatch_pct = 50.0
///
/// [sensitivity]
/// "Kangaroo Creek" = 40.0
///
/// [window]
/// from = "2024-01-01"
/// ```
use crate::alert::thresholds::{ThresholdConfig, validate_threshold};
use crate::analysis::filter::DateRange;
use crate::error::{CatchmentError, CatchmentResult};
use crate::logging::{self, DataSource};
use crate::model::AlertKind;
use crate::sites::find_site;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "CATCHMENT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "catchment.toml";

/// Input file locations. Relative paths resolve against the config file's
/// directory. The sensor export must exist; the others load as empty when
/// absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DataPaths {
    pub sensor: PathBuf,
    pub lab: Option<PathBuf>,
    pub rainfall: Option<PathBuf>,
    pub streamflow: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            sensor: PathBuf::from("data/ecodetection_clean_data.csv"),
            lab: Some(PathBuf::from("data/cw_catchment_sampling.csv")),
            rainfall: Some(PathBuf::from("data/clean_bom_data.csv")),
            streamflow: Some(PathBuf::from("data/clean_wims_data.csv")),
        }
    }
}

impl DataPaths {
    pub fn resolve(&self, base_dir: &Path) -> DataPaths {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            }
        };
        DataPaths {
            sensor: join(&self.sensor),
            lab: self.lab.as_ref().map(join),
            rainfall: self.rainfall.as_ref().map(join),
            streamflow: self.streamflow.as_ref().map(join),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CatchmentConfig {
    pub data: DataPaths,
    pub thresholds: ThresholdConfig,
    /// Mismatch percentage per site, keyed by any site name or alias.
    pub sensitivity: BTreeMap<String, f64>,
    /// Default date window for new sessions.
    pub window: DateRange,
}

impl CatchmentConfig {
    pub fn validate(&self) -> CatchmentResult<()> {
        self.thresholds.validate()?;
        for (name, pct) in &self.sensitivity {
            if find_site(name).is_none() {
                return Err(CatchmentError::UnknownSite(name.clone()));
            }
            validate_threshold(AlertKind::EcoLabMismatch, *pct)?;
        }
        Ok(())
    }
}

pub fn parse_config(text: &str) -> CatchmentResult<CatchmentConfig> {
    let config: CatchmentConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Reads the config at `path`, with data paths resolved against its
/// directory.
pub fn load_config(path: &Path) -> CatchmentResult<CatchmentConfig> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut config = match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            logging::warn(
                DataSource::Config,
                None,
                &format!("{} not found, using default configuration", path.display()),
            );
            CatchmentConfig::default()
        }
        Err(source) => {
            return Err(CatchmentError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    config.data = config.data.resolve(base_dir);
    logging::debug(DataSource::Config, None, &format!("config: {:?}", config));
    Ok(config)
}

/// Config file location: the explicit path if given, else
/// `CATCHMENT_CONFIG`, else `catchment.toml` in the working directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
