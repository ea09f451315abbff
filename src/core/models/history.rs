use serde::{Deserialize, Serialize};

use crate::core::calendar::day_label;

/// One recorded per-day-remaining value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySample {
    /// Day of month, 1-31
    pub day: u32,
    pub value: f64,
    /// True when synthesized by the gap-filler rather than computed
    #[serde(default)]
    pub interpolated: bool,
}

impl DailySample {
    pub fn label(&self) -> String {
        day_label(self.day)
    }
}

/// A (label, value) pair handed to a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Y-axis range of the history chart. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    pub value: f64,
    pub label: String,
}

/// Chart-ready view of the current month's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub points: Vec<ChartPoint>,
    /// Min/max over the recorded values
    pub natural: ChartBounds,
    /// Bounds after applying any user override
    pub bounds: ChartBounds,
    /// Set when the requested min was rejected and replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_min: Option<f64>,
    /// Set when the requested max was rejected and replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_max: Option<f64>,
    pub ticks: Vec<AxisTick>,
}
