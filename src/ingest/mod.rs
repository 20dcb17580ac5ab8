/// Loading of the four input collections.
///
/// - `table` — header-addressed CSV parsing.
/// - `rows`  — typed raw rows per collection.
///
/// `load_dataset` reads every configured file, normalizes it and returns an
/// immutable `Dataset` snapshot that evaluations run against.

pub mod rows;
pub mod table;

use crate::config::DataPaths;
use crate::error::{CatchmentError, CatchmentResult};
use crate::logging::{self, DataSource};
use crate::model::{Observation, StationReading};
use crate::normalize::{
    SkipTally, normalize_lab_rows, normalize_rainfall_rows, normalize_sensor_rows,
    normalize_streamflow_rows,
};
use std::path::Path;
use table::Table;

/// Canonical observations for every collection.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub sensor: Vec<Observation>,
    pub lab: Vec<Observation>,
    /// Rainfall attributed to each site on the gauge.
    pub rainfall: Vec<Observation>,
    /// Rainfall as exported, one entry per source row.
    pub rainfall_readings: Vec<StationReading>,
    pub streamflow: Vec<Observation>,
    /// Rows dropped across all collections.
    pub skipped: SkipTally,
}

pub fn read_table(path: &Path) -> CatchmentResult<Table> {
    let text = std::fs::read_to_string(path).map_err(|source| CatchmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(table::parse_table(&name, &text))
}

/// Reads an optional collection. A path that is unset or does not exist
/// yields `None`; the caller treats that collection as empty.
fn read_optional_table(path: Option<&Path>, source: DataSource) -> CatchmentResult<Option<Table>> {
    match path {
        Some(path) if path.exists() => read_table(path).map(Some),
        Some(path) => {
            logging::warn(
                source,
                None,
                &format!("{} not found, continuing without {} data", path.display(), source),
            );
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Reads and normalizes every configured collection. The sensor export is
/// required; lab, rainfall and streamflow files load as empty when unset or
/// missing.
pub fn load_dataset(paths: &DataPaths) -> CatchmentResult<Dataset> {
    let mut dataset = Dataset::default();

    let sensor = normalize_sensor_rows(&rows::sensor_rows(&read_table(&paths.sensor)?)?);
    dataset.sensor = sensor.observations;
    dataset.skipped.merge(&sensor.skipped);

    if let Some(table) = read_optional_table(paths.lab.as_deref(), DataSource::Lab)? {
        let lab = normalize_lab_rows(&rows::lab_rows(&table)?);
        dataset.lab = lab.observations;
        dataset.skipped.merge(&lab.skipped);
    }
    if let Some(table) = read_optional_table(paths.rainfall.as_deref(), DataSource::Rainfall)? {
        let rainfall = normalize_rainfall_rows(&rows::rainfall_rows(&table)?);
        dataset.rainfall = rainfall.observations;
        dataset.rainfall_readings = rainfall.readings;
        dataset.skipped.merge(&rainfall.skipped);
    }
    if let Some(table) = read_optional_table(paths.streamflow.as_deref(), DataSource::Streamflow)? {
        let streamflow = normalize_streamflow_rows(&rows::streamflow_rows(&table)?);
        dataset.streamflow = streamflow.observations;
        dataset.skipped.merge(&streamflow.skipped);
    }

    logging::info(
        DataSource::Engine,
        None,
        &format!(
            "Loaded {} sensor, {} lab, {} rainfall, {} streamflow observations ({} rows skipped)",
            dataset.sensor.len(),
            dataset.lab.len(),
            dataset.rainfall.len(),
            dataset.streamflow.len(),
            dataset.skipped.total()
        ),
    );
    Ok(dataset)
}
