//! Report export.
//!
//! Builds the downloadable report: sensor data pivoted to one row per
//! (date, site) with a column per parameter, rainfall per gauge station as
//! exported, and the lab results, each most recent first.

use crate::ingest::Dataset;
use crate::model::{Observation, Parameter, Site, StationReading};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

// ---------------------------------------------------------------------------
// Pivot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub date: NaiveDate,
    pub site: Site,
    /// One entry per `PivotTable::parameters` column.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    pub parameters: Vec<Parameter>,
    pub rows: Vec<PivotRow>,
}

/// Pivots observations to `(date, site)` rows × parameter columns. Cells
/// with several readings hold their mean. Rows are most recent first, then
/// by site.
pub fn pivot_by_date_site(observations: &[Observation]) -> PivotTable {
    let parameters: Vec<Parameter> = observations
        .iter()
        .map(|o| o.parameter)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells: BTreeMap<(NaiveDate, Site), BTreeMap<Parameter, (f64, usize)>> = BTreeMap::new();
    for o in observations {
        let cell = cells
            .entry((o.timestamp, o.site))
            .or_default()
            .entry(o.parameter)
            .or_insert((0.0, 0));
        cell.0 += o.value;
        cell.1 += 1;
    }

    let mut rows: Vec<PivotRow> = cells
        .into_iter()
        .map(|((date, site), by_parameter)| PivotRow {
            date,
            site,
            values: parameters
                .iter()
                .map(|p| by_parameter.get(p).map(|(sum, count)| sum / *count as f64))
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.site.cmp(&b.site)));

    PivotTable { parameters, rows }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_sensor: bool,
    pub include_rainfall: bool,
    pub include_lab: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            include_sensor: true,
            include_rainfall: true,
            include_lab: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReportSection {
    EcoDetection(PivotTable),
    Rainfall(Vec<StationReading>),
    Lab(Vec<Observation>),
}

impl ReportSection {
    pub fn key(&self) -> &'static str {
        match self {
            ReportSection::EcoDetection(_) => "EcoDetection",
            ReportSection::Rainfall(_) => "Rainfall",
            ReportSection::Lab(_) => "Lab",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub sections: Vec<ReportSection>,
}

fn newest_first(observations: &[Observation]) -> Vec<Observation> {
    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

pub fn build_report(dataset: &Dataset, options: ReportOptions) -> Report {
    let mut sections = Vec::new();
    if options.include_sensor {
        sections.push(ReportSection::EcoDetection(pivot_by_date_site(&dataset.sensor)));
    }
    if options.include_rainfall {
        let mut readings = dataset.rainfall_readings.clone();
        readings.sort_by(|a, b| b.date.cmp(&a.date));
        sections.push(ReportSection::Rainfall(readings));
    }
    if options.include_lab {
        sections.push(ReportSection::Lab(newest_first(&dataset.lab)));
    }
    Report { sections }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl Report {
    /// True when no section was selected.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Renders the report as CSV. Each section is a block with its own
    /// header row, prefixed by a `section` column, separated by a blank line.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let key = section.key();
            // Writing to a String cannot fail.
            match section {
                ReportSection::EcoDetection(pivot) => {
                    let mut header = vec!["section".to_string(), "date".to_string(), "site".to_string()];
                    header.extend(pivot.parameters.iter().map(|p| {
                        csv_field(&format!("{} ({})", p.name(), p.canonical_unit()))
                    }));
                    let _ = writeln!(out, "{}", header.join(","));
                    for row in &pivot.rows {
                        let mut fields = vec![key.to_string(), row.date.to_string(), csv_field(row.site.name())];
                        fields.extend(row.values.iter().map(|v| csv_number(*v)));
                        let _ = writeln!(out, "{}", fields.join(","));
                    }
                }
                ReportSection::Rainfall(readings) => {
                    let _ = writeln!(out, "section,date,station_number,rainfall_mm");
                    for r in readings {
                        let _ = writeln!(out, "{},{},{},{}", key, r.date, r.station, r.value);
                    }
                }
                ReportSection::Lab(observations) => {
                    let _ = writeln!(out, "section,date,site,parameter,result,units");
                    for o in observations {
                        let _ = writeln!(
                            out,
                            "{},{},{},{},{},{}",
                            key,
                            o.timestamp,
                            csv_field(o.site.name()),
                            csv_field(o.parameter.name()),
                            o.value,
                            csv_field(o.parameter.canonical_unit())
                        );
                    }
                }
            }
        }
        out
    }
}
