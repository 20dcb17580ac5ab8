/// Time-series normalization.
///
/// Turns raw export rows into canonical `Observation`s: dates from either
/// spreadsheet serial day counts or date strings, parameter names through
/// the alias table, site names through the site registry, and `ppb`
/// readings into mg/L.
///
/// Nothing here fails the batch. A row that cannot be normalized is dropped,
/// counted in a `SkipTally` and logged.
use crate::ingest::rows::{LabRow, RainfallRow, SensorRow, StreamflowRow};
use crate::logging::{self, DataSource};
use crate::model::{Observation, Parameter, RowError, Site, Source, StationReading};
use crate::parameters::{accepted_units, resolve_parameter_alias};
use crate::sites::{resolve_site, sites_for_rainfall_station, sites_for_streamflow_station};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// `num_days_from_ce` of 1899-12-30, day zero of the spreadsheet serial
/// date system.
const SERIAL_EPOCH_DAYS_FROM_CE: i32 = 693_594;

/// Largest serial day spreadsheets can represent (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Converts a spreadsheet serial day count to a calendar date. The
/// fractional part (time of day) is discarded, rounding towards the earlier
/// day. Negative serials count back from the epoch.
pub fn from_serial_day(serial: f64) -> Result<NaiveDate, RowError> {
    let malformed = || RowError::MalformedTimestamp(serial.to_string());
    if !serial.is_finite() || serial > MAX_SERIAL_DAY || serial < f64::from(i32::MIN) {
        return Err(malformed());
    }
    let days = serial.floor() as i32;
    SERIAL_EPOCH_DAYS_FROM_CE
        .checked_add(days)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(malformed)
}

/// Inverse of `from_serial_day` for whole days.
pub fn to_serial_day(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - SERIAL_EPOCH_DAYS_FROM_CE)
}

/// Parses a date field that is either a serial day count or a date string.
///
/// Date-time strings keep only their calendar date; RFC 3339 strings keep
/// the date in their own offset.
pub fn normalize_timestamp(raw: &str) -> Result<NaiveDate, RowError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(RowError::MalformedTimestamp(raw.to_string()));
    }

    if let Ok(serial) = s.parse::<f64>() {
        return from_serial_day(serial).map_err(|_| RowError::MalformedTimestamp(raw.to_string()));
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.date_naive());
    }

    Err(RowError::MalformedTimestamp(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnitConversion {
    /// Source unit was ppb; value now in mg/L.
    FromPpb(f64),
    Canonical(f64),
    /// Passed through unchanged.
    Unrecognized(f64),
}

fn convert_unit(parameter: Parameter, raw_value: f64, raw_unit: &str) -> UnitConversion {
    let unit = raw_unit.trim();
    if unit.eq_ignore_ascii_case("ppb") {
        return UnitConversion::FromPpb(raw_value * 0.001);
    }
    let known = unit.eq_ignore_ascii_case(parameter.canonical_unit())
        || accepted_units(parameter)
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(unit));
    if known {
        UnitConversion::Canonical(raw_value)
    } else {
        UnitConversion::Unrecognized(raw_value)
    }
}

/// Converts a raw value into the canonical unit for `parameter`.
///
/// `ppb` is multiplied by 0.001 to give mg/L. Anything else passes through
/// unchanged; a unit that is not known for the parameter is logged as a
/// warning under `source`'s log target since it usually means the export
/// changed.
pub fn normalize_unit(source: Source, parameter: Parameter, raw_value: f64, raw_unit: &str) -> f64 {
    match convert_unit(parameter, raw_value, raw_unit) {
        UnitConversion::FromPpb(value) | UnitConversion::Canonical(value) => value,
        UnitConversion::Unrecognized(value) => {
            warn_unrecognized_unit(DataSource::from(source), parameter, raw_unit);
            value
        }
    }
}

fn warn_unrecognized_unit(source: DataSource, parameter: Parameter, raw_unit: &str) {
    logging::warn(
        source,
        None,
        &format!(
            "unrecognized unit '{}' for {}; value passed through as {}",
            raw_unit,
            parameter,
            parameter.canonical_unit()
        ),
    );
}

// ---------------------------------------------------------------------------
// Batch normalization
// ---------------------------------------------------------------------------

/// Counts of rows dropped from the canonical stream, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipTally {
    pub malformed_timestamp: usize,
    pub unknown_parameter: usize,
    pub unknown_site: usize,
    pub missing_value: usize,
}

impl SkipTally {
    pub fn record(&mut self, err: &RowError) {
        match err {
            RowError::MalformedTimestamp(_) => self.malformed_timestamp += 1,
            RowError::UnknownParameter(_) => self.unknown_parameter += 1,
            RowError::UnknownSite(_) => self.unknown_site += 1,
            RowError::MissingValue(_) => self.missing_value += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.malformed_timestamp + self.unknown_parameter + self.unknown_site + self.missing_value
    }

    pub fn merge(&mut self, other: &SkipTally) {
        self.malformed_timestamp += other.malformed_timestamp;
        self.unknown_parameter += other.unknown_parameter;
        self.unknown_site += other.unknown_site;
        self.missing_value += other.missing_value;
    }
}

/// Output of a batch normalization.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub observations: Vec<Observation>,
    /// Gauge batches only: one entry per valid source row, including rows
    /// from stations no site is registered on.
    pub readings: Vec<StationReading>,
    pub skipped: SkipTally,
}

fn normalize_batch<R>(
    source: DataSource,
    rows: &[R],
    line_of: impl Fn(&R) -> usize,
    mut convert: impl FnMut(&R) -> Result<Vec<Observation>, RowError>,
) -> Normalized {
    let mut out = Normalized::default();
    let mut kept = 0;

    for row in rows {
        match convert(row) {
            Ok(observations) => {
                kept += 1;
                out.observations.extend(observations);
            }
            Err(err) => {
                logging::log_row_failure(source, line_of(row), &err);
                out.skipped.record(&err);
            }
        }
    }

    logging::log_normalize_summary(source, rows.len(), kept, &out.skipped);
    out
}

/// Shared by sensor and lab rows, which differ only in column names.
struct MeasurementFields<'a> {
    location: &'a str,
    date: &'a str,
    measurement: &'a str,
    result: Option<f64>,
    unit: &'a str,
}

fn measurement_observation(
    source: Source,
    fields: MeasurementFields<'_>,
    unrecognized_units: &mut BTreeSet<(Parameter, String)>,
) -> Result<Observation, RowError> {
    let parameter = resolve_parameter_alias(source, fields.measurement)
        .ok_or_else(|| RowError::UnknownParameter(fields.measurement.to_string()))?;
    let site = resolve_site(source, fields.location)
        .ok_or_else(|| RowError::UnknownSite(fields.location.to_string()))?;
    let raw_value = fields.result.ok_or(match source {
        Source::Sensor => RowError::MissingValue("result"),
        Source::Lab => RowError::MissingValue("Result"),
    })?;
    let timestamp = normalize_timestamp(fields.date)?;

    let value = match convert_unit(parameter, raw_value, fields.unit) {
        UnitConversion::FromPpb(value) | UnitConversion::Canonical(value) => value,
        UnitConversion::Unrecognized(value) => {
            // Warn once per distinct unit rather than once per row.
            if unrecognized_units.insert((parameter, fields.unit.to_string())) {
                warn_unrecognized_unit(DataSource::from(source), parameter, fields.unit);
            }
            value
        }
    };

    Ok(Observation {
        site,
        parameter,
        timestamp,
        value,
        source,
    })
}

pub fn normalize_sensor_rows(rows: &[SensorRow]) -> Normalized {
    let mut unrecognized_units = BTreeSet::new();
    normalize_batch(DataSource::Sensor, rows, |r| r.line, |row| {
        let fields = MeasurementFields {
            location: &row.location,
            date: &row.timestamp,
            measurement: &row.measurement,
            result: row.result,
            unit: &row.unit,
        };
        measurement_observation(Source::Sensor, fields, &mut unrecognized_units).map(|o| vec![o])
    })
}

pub fn normalize_lab_rows(rows: &[LabRow]) -> Normalized {
    let mut unrecognized_units = BTreeSet::new();
    normalize_batch(DataSource::Lab, rows, |r| r.line, |row| {
        let fields = MeasurementFields {
            location: &row.subsite_code,
            date: &row.date_sampled,
            measurement: &row.measure,
            result: row.result,
            unit: &row.units,
        };
        measurement_observation(Source::Lab, fields, &mut unrecognized_units).map(|o| vec![o])
    })
}

fn station_reading(
    station: Option<u32>,
    date: &str,
    value: Option<f64>,
    value_column: &'static str,
) -> Result<StationReading, RowError> {
    let station = station.ok_or_else(|| RowError::UnknownSite(String::new()))?;
    let value = value.ok_or(RowError::MissingValue(value_column))?;
    let date = normalize_timestamp(date)?;
    Ok(StationReading { station, date, value })
}

/// One observation per site served by the gauge.
fn gauge_observations(
    parameter: Parameter,
    reading: StationReading,
    sites_for: fn(u32) -> Vec<Site>,
) -> Result<Vec<Observation>, RowError> {
    let sites = sites_for(reading.station);
    if sites.is_empty() {
        return Err(RowError::UnknownSite(reading.station.to_string()));
    }
    Ok(sites
        .into_iter()
        .map(|site| Observation {
            site,
            parameter,
            timestamp: reading.date,
            value: reading.value,
            source: Source::Sensor,
        })
        .collect())
}

/// Rainfall rows become `Rainfall` observations for every site whose
/// registry entry names the station. Each valid row is also kept once as a
/// station reading.
pub fn normalize_rainfall_rows(rows: &[RainfallRow]) -> Normalized {
    let mut readings = Vec::new();
    let mut out = normalize_batch(DataSource::Rainfall, rows, |r| r.line, |row| {
        let reading = station_reading(row.station_number, &row.date, row.rainfall, "rainfall")?;
        readings.push(reading);
        gauge_observations(Parameter::Rainfall, reading, sites_for_rainfall_station)
    });
    out.readings = readings;
    out
}

pub fn normalize_streamflow_rows(rows: &[StreamflowRow]) -> Normalized {
    let mut readings = Vec::new();
    let mut out = normalize_batch(DataSource::Streamflow, rows, |r| r.line, |row| {
        let reading = station_reading(
            row.station_number,
            &row.datetime,
            row.discharge_ml_day,
            "discharge_ml_day",
        )?;
        readings.push(reading);
        gauge_observations(Parameter::Streamflow, reading, sites_for_streamflow_station)
    });
    out.readings = readings;
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sensor_row(location: &str, timestamp: &str, measurement: &str, result: Option<f64>, unit: &str) -> SensorRow {
        SensorRow {
            line: 2,
            location: location.to_string(),
            timestamp: timestamp.to_string(),
            measurement: measurement.to_string(),
            result,
            unit: unit.to_string(),
        }
    }

    // --- Timestamps ---------------------------------------------------------

    #[test]
    fn test_serial_day_epoch_is_1899_12_30() {
        assert_eq!(from_serial_day(0.0).unwrap(), date(1899, 12, 30));
        assert_eq!(from_serial_day(45292.0).unwrap(), date(2024, 1, 1));
    }

    #[test]
    fn test_fractional_serial_day_drops_time_of_day() {
        assert_eq!(normalize_timestamp("45292.75").unwrap(), date(2024, 1, 1));
    }

    #[test]
    fn test_serial_round_trip() {
        for d in [
            date(1850, 6, 1),
            date(1899, 12, 29),
            date(1900, 3, 1),
            date(2023, 9, 2),
            date(2024, 2, 29),
            date(2099, 12, 31),
        ] {
            assert_eq!(from_serial_day(to_serial_day(d)).unwrap(), d);
            assert_eq!(normalize_timestamp(&to_serial_day(d).to_string()).unwrap(), d);
        }
    }

    #[test]
    fn test_serials_before_the_epoch_count_backwards() {
        assert_eq!(to_serial_day(date(1850, 6, 1)), -18109.0);
        assert_eq!(from_serial_day(-18109.0).unwrap(), date(1850, 6, 1));
        assert_eq!(normalize_timestamp("-1").unwrap(), date(1899, 12, 29));
        // Time of day on a negative serial still belongs to the earlier day.
        assert_eq!(from_serial_day(-0.5).unwrap(), date(1899, 12, 29));
    }

    #[test]
    fn test_string_dates_in_supported_formats() {
        let expected = date(2024, 3, 5);
        for raw in [
            "2024-03-05",
            "05/03/2024",
            "2024-03-05 14:30:00",
            "2024-03-05 14:30",
            "2024-03-05T14:30:00",
            "2024-03-05T23:30:00+11:00",
        ] {
            assert_eq!(normalize_timestamp(raw), Ok(expected), "failed to parse '{}'", raw);
        }
    }

    #[test]
    fn test_slash_dates_are_day_first() {
        assert_eq!(normalize_timestamp("05/03/2024"), Ok(date(2024, 3, 5)));
        assert_eq!(normalize_timestamp("13/01/2024 08:15"), Ok(date(2024, 1, 13)));
        assert!(normalize_timestamp("01/13/2024").is_err(), "month-first is not accepted");
    }

    #[test]
    fn test_malformed_timestamps() {
        for raw in ["", "   ", "yesterday", "2024-13-01", "inf", "NaN", "1e12", "-1e12", "-1e9"] {
            assert!(
                matches!(normalize_timestamp(raw), Err(RowError::MalformedTimestamp(_))),
                "'{}' should be malformed",
                raw
            );
        }
    }

    // --- Units --------------------------------------------------------------

    #[test]
    fn test_ppb_is_converted_to_mg_per_litre() {
        for v in [0.0, 1.0, 250.0, 1234.5] {
            assert_eq!(normalize_unit(Source::Sensor, Parameter::Nitrate, v, "ppb"), v * 0.001);
        }
        assert_eq!(normalize_unit(Source::Sensor, Parameter::Phosphate, 40.0, "PPB"), 40.0 * 0.001);
    }

    #[test]
    fn test_non_ppb_values_pass_through() {
        assert_eq!(normalize_unit(Source::Sensor, Parameter::Turbidity, 7.5, "NTU"), 7.5);
        assert_eq!(normalize_unit(Source::Sensor, Parameter::Nitrate, 0.05, "mg/L"), 0.05);
        // Unknown unit: permissive pass-through, whichever source it came from.
        assert_eq!(normalize_unit(Source::Sensor, Parameter::Turbidity, 7.5, "FNU"), 7.5);
        assert_eq!(normalize_unit(Source::Lab, Parameter::Turbidity, 7.5, "FNU"), 7.5);
    }

    #[test]
    fn test_unit_classification() {
        assert_eq!(convert_unit(Parameter::Ph, 7.1, ""), UnitConversion::Canonical(7.1));
        assert_eq!(convert_unit(Parameter::Turbidity, 3.0, ""), UnitConversion::Unrecognized(3.0));
        assert_eq!(
            convert_unit(Parameter::Conductivity, 210.0, "µS/cm"),
            UnitConversion::Canonical(210.0)
        );
    }

    // --- Batches ------------------------------------------------------------

    #[test]
    fn test_sensor_batch_normalizes_and_tallies() {
        let rows = vec![
            sensor_row("Kangaroo Creek", "45292", "Nitrate Concentration", Some(500.0), "ppb"),
            sensor_row("Kangaroo Creek", "not a date", "Nephelo Turbidity", Some(3.0), "NTU"),
            sensor_row("Kangaroo Creek", "45292", "Battery Voltage", Some(12.1), "V"),
            sensor_row("Campaspe River", "45292", "Nephelo Turbidity", Some(3.0), "NTU"),
            sensor_row("Kangaroo Creek", "45292", "Nephelo Turbidity", None, "NTU"),
        ];
        let normalized = normalize_sensor_rows(&rows);

        assert_eq!(
            normalized.observations,
            vec![Observation {
                site: Site::KangarooCreek,
                parameter: Parameter::Nitrate,
                timestamp: date(2024, 1, 1),
                value: 0.5,
                source: Source::Sensor,
            }]
        );
        assert_eq!(
            normalized.skipped,
            SkipTally {
                malformed_timestamp: 1,
                unknown_parameter: 1,
                unknown_site: 1,
                missing_value: 1,
            }
        );
        assert_eq!(normalized.skipped.total(), 4);
    }

    #[test]
    fn test_lab_batch_resolves_subsite_codes() {
        let rows = vec![LabRow {
            line: 2,
            subsite_code: "SITE17".to_string(),
            date_sampled: "2024-01-01".to_string(),
            measure: "Turbidity".to_string(),
            result: Some(4.0),
            units: "NTU".to_string(),
        }];
        let normalized = normalize_lab_rows(&rows);
        assert_eq!(normalized.observations.len(), 1);
        assert_eq!(normalized.observations[0].site, Site::KangarooCreek);
        assert_eq!(normalized.observations[0].source, Source::Lab);
    }

    #[test]
    fn test_rainfall_row_fans_out_to_every_site_on_the_station() {
        let rows = vec![
            RainfallRow {
                line: 2,
                station_number: Some(88061),
                date: "2024-01-01".to_string(),
                rainfall: Some(21.0),
            },
            RainfallRow {
                line: 3,
                station_number: Some(88051), // temperature-only station
                date: "2024-01-01".to_string(),
                rainfall: Some(1.0),
            },
        ];
        let normalized = normalize_rainfall_rows(&rows);
        let sites: Vec<_> = normalized.observations.iter().map(|o| o.site).collect();
        assert_eq!(sites, vec![Site::FiveMileCreekSite1, Site::FiveMileCreekSite2]);
        assert!(normalized.observations.iter().all(|o| o.parameter == Parameter::Rainfall));
        assert_eq!(normalized.skipped.unknown_site, 1);
    }

    #[test]
    fn test_rainfall_rows_are_kept_once_per_station() {
        let row = |line, station_number, date: &str, rainfall| RainfallRow {
            line,
            station_number,
            date: date.to_string(),
            rainfall,
        };
        let rows = vec![
            row(2, Some(88061), "2024-01-01", Some(21.0)),
            row(3, Some(88051), "2024-01-01", Some(1.0)),
            row(4, Some(88061), "not a date", Some(3.0)),
            row(5, None, "2024-01-01", Some(3.0)),
        ];
        let normalized = normalize_rainfall_rows(&rows);

        assert_eq!(normalized.observations.len(), 2, "88061 serves two sites");
        assert_eq!(
            normalized.readings,
            vec![
                StationReading {
                    station: 88061,
                    date: date(2024, 1, 1),
                    value: 21.0,
                },
                StationReading {
                    station: 88051,
                    date: date(2024, 1, 1),
                    value: 1.0,
                },
            ]
        );
        assert_eq!(normalized.skipped.total(), 3);
    }

    #[test]
    fn test_streamflow_rows_use_datetime_column() {
        let rows = vec![StreamflowRow {
            line: 2,
            station_number: Some(406280),
            datetime: "2023-09-02 09:00:00".to_string(),
            discharge_ml_day: Some(12.5),
        }];
        let normalized = normalize_streamflow_rows(&rows);
        assert_eq!(normalized.observations.len(), 1);
        assert_eq!(normalized.observations[0].site, Site::LittleColibanRiver);
        assert_eq!(normalized.observations[0].timestamp, date(2023, 9, 2));
    }

    #[test]
    fn test_skip_tally_merge() {
        let mut a = SkipTally { malformed_timestamp: 1, ..Default::default() };
        let b = SkipTally { unknown_site: 2, ..Default::default() };
        a.merge(&b);
        assert_eq!(a.total(), 3);
    }
}
