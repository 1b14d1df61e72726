//! Structured outcome of one control tick.

use crate::allocation::Bounds;

/// Everything a tick computed and sent.
///
/// `raw_*` are the offset-adjusted sums pushed into the windows, `smoothed_*`
/// the window averages before gating, `allocated_*` the allocator outputs.
/// `dispatched_*` is `None` for an axis that was disabled at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub storage_id: String,
    pub raw_active: i64,
    pub raw_reactive: i64,
    pub smoothed_active: i64,
    pub smoothed_reactive: i64,
    pub bounds: Bounds,
    pub allocated_active: i64,
    pub allocated_reactive: i64,
    pub dispatched_active: Option<i64>,
    pub dispatched_reactive: Option<i64>,
}
