/// Data organization for the catchment reconciliation service.
///
/// Submodules:
/// - `align`  — pairs sensor and lab observations by site, parameter and date.
/// - `filter`   — date range / parameter selection.
/// - `overview` — one site's grouped readings, gauges and alerts.
/// - `report`   — pivoted report export.

pub mod align;
pub mod filter;
pub mod overview;
pub mod report;
