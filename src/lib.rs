//! Catchment data reconciliation and alerting.
//!
//! Loads automated sensor exports, certified lab results and gauge data,
//! normalizes them to canonical observations, pairs sensor readings with lab
//! samples, and raises threshold and mismatch alerts per monitoring site.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod parameters;
pub mod session;
pub mod sites;
