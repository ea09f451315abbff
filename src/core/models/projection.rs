use serde::{Deserialize, Serialize};

/// Derived metrics for one instant of a billing month. All amounts in GB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    /// Fractional hours since local midnight on the 1st
    pub hours_elapsed: f64,
    /// Fractional days until the end of the month
    pub days_left_in_month: f64,
    /// Cumulative allowance up to now, rounded per the configured policy
    pub gb_allowed_so_far: f64,
    /// Quota minus usage; negative when over quota
    pub gb_left_to_use: f64,
    pub gb_per_day_remaining: f64,
    pub gb_per_day_average: f64,
    /// Allowance so far minus usage; negative when ahead of pace
    pub gb_pace_difference: f64,
    pub used_gb: f64,
    pub total_gb: f64,
}
