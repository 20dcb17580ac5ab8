/// Threshold and mismatch evaluation.
///
/// - `thresholds` — ceiling checks and the session's threshold set.
/// - `outliers`   — IQR outlier detection per series.
/// - `mismatch`   — sensor vs lab percentage difference.
/// - `evaluate`   — the full pass over a dataset for one session.

pub mod evaluate;
pub mod mismatch;
pub mod outliers;
pub mod thresholds;

pub use evaluate::{DataGap, Evaluation, GapKind, evaluate};
