//! Typed raw rows for each input collection.
//!
//! Values are extracted but not interpreted: dates stay as text (they may be
//! serial day counts or date strings) and names are not yet resolved. That
//! is the normalizer's job.

use super::table::{Table, parse_number, parse_station};
use crate::error::CatchmentResult;

/// EcoDetection sensor export row.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub line: usize,
    pub location: String,
    pub timestamp: String,
    pub measurement: String,
    pub result: Option<f64>,
    pub unit: String,
}

/// Lab sampling export row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabRow {
    pub line: usize,
    pub subsite_code: String,
    pub date_sampled: String,
    pub measure: String,
    pub result: Option<f64>,
    pub units: String,
}

/// BOM daily rainfall row, in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallRow {
    pub line: usize,
    pub station_number: Option<u32>,
    pub date: String,
    pub rainfall: Option<f64>,
}

/// DEECA streamflow row, in megalitres per day.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamflowRow {
    pub line: usize,
    pub station_number: Option<u32>,
    pub datetime: String,
    pub discharge_ml_day: Option<f64>,
}

pub fn sensor_rows(table: &Table) -> CatchmentResult<Vec<SensorRow>> {
    let location = table.column("location")?;
    let timestamp = table.column("timestamp")?;
    let measurement = table.column("measurement")?;
    let result = table.column("result")?;
    let unit = table.column("unit")?;

    Ok(table
        .records
        .iter()
        .map(|r| SensorRow {
            line: r.line,
            location: r.get(location).to_string(),
            timestamp: r.get(timestamp).to_string(),
            measurement: r.get(measurement).to_string(),
            result: parse_number(r.get(result)),
            unit: r.get(unit).to_string(),
        })
        .collect())
}

pub fn lab_rows(table: &Table) -> CatchmentResult<Vec<LabRow>> {
    let subsite = table.column("Subsite_Code")?;
    let date = table.column("date_sampled")?;
    let measure = table.column("Measure")?;
    let result = table.column("Result")?;
    let units = table.column("Units")?;

    Ok(table
        .records
        .iter()
        .map(|r| LabRow {
            line: r.line,
            subsite_code: r.get(subsite).to_string(),
            date_sampled: r.get(date).to_string(),
            measure: r.get(measure).to_string(),
            result: parse_number(r.get(result)),
            units: r.get(units).to_string(),
        })
        .collect())
}

pub fn rainfall_rows(table: &Table) -> CatchmentResult<Vec<RainfallRow>> {
    let station = table.column("station_number")?;
    let date = table.column("date")?;
    let rainfall = table.column("rainfall")?;

    Ok(table
        .records
        .iter()
        .map(|r| RainfallRow {
            line: r.line,
            station_number: parse_station(r.get(station)),
            date: r.get(date).to_string(),
            rainfall: parse_number(r.get(rainfall)),
        })
        .collect())
}

pub fn streamflow_rows(table: &Table) -> CatchmentResult<Vec<StreamflowRow>> {
    let station = table.column("station_number")?;
    let datetime = table.column("datetime")?;
    let discharge = table.column("discharge_ml_day")?;

    Ok(table
        .records
        .iter()
        .map(|r| StreamflowRow {
            line: r.line,
            station_number: parse_station(r.get(station)),
            datetime: r.get(datetime).to_string(),
            discharge_ml_day: parse_number(r.get(discharge)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::table::parse_table;

    #[test]
    fn test_sensor_rows_extracted_by_column_name() {
        // Column order differs from the canonical listing on purpose.
        let csv = "unit,result,measurement,timestamp,location\n\
                   ppb,120,Nitrate Concentration,45200.25,Little Coliban River\n";
        let rows = sensor_rows(&parse_table("sensor.csv", csv)).expect("all columns present");
        assert_eq!(
            rows,
            vec![SensorRow {
                line: 2,
                location: "Little Coliban River".to_string(),
                timestamp: "45200.25".to_string(),
                measurement: "Nitrate Concentration".to_string(),
                result: Some(120.0),
                unit: "ppb".to_string(),
            }]
        );
    }

    #[test]
    fn test_lab_rows_require_subsite_code() {
        let csv = "date_sampled,Measure,Result,Units\n2024-01-01,Turbidity,3,NTU\n";
        assert!(lab_rows(&parse_table("lab.csv", csv)).is_err());
    }

    #[test]
    fn test_blank_result_becomes_none() {
        let csv = "Subsite_Code,date_sampled,Measure,Result,Units\nSITE2,2024-01-01,Turbidity,,NTU\n";
        let rows = lab_rows(&parse_table("lab.csv", csv)).unwrap();
        assert_eq!(rows[0].result, None);
    }

    #[test]
    fn test_rainfall_and_streamflow_rows() {
        let rain = rainfall_rows(&parse_table(
            "rain.csv",
            "station_number,date,rainfall\n88061.0,2024-02-01,12.4\n",
        ))
        .unwrap();
        assert_eq!(rain[0].station_number, Some(88061));
        assert_eq!(rain[0].rainfall, Some(12.4));

        let flow = streamflow_rows(&parse_table(
            "flow.csv",
            "station_number,datetime,discharge_ml_day\n406266,2024-02-01 09:00:00,35.1\n",
        ))
        .unwrap();
        assert_eq!(flow[0].station_number, Some(406266));
        assert_eq!(flow[0].datetime, "2024-02-01 09:00:00");
    }
}
