use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::calendar::{days_in_month, start_of_month};
use crate::core::models::projection::Projection;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Computation undefined at this instant: no time left in {year}-{month:02}")]
    MonthBoundary { year: i32, month: u32 },
    #[error("Invalid quota total: {0} GB (must be a positive number)")]
    InvalidQuota(f64),
    #[error("Invalid usage amount: {0} GB")]
    InvalidUsage(f64),
}

/// How the cumulative allowance is rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    #[default]
    WholeGb,
    Decimals(u32),
}

impl RoundingPolicy {
    /// `0` means whole GB, anything else keeps that many decimals.
    pub fn from_precision(decimals: u32) -> Self {
        if decimals == 0 {
            Self::WholeGb
        } else {
            Self::Decimals(decimals)
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::WholeGb => value.round(),
            Self::Decimals(n) => {
                let factor = 10f64.powi(*n as i32);
                (value * factor).round() / factor
            }
        }
    }
}

/// One billing month's inputs. Derived values are computed, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaPeriod {
    pub year: i32,
    pub month: u32,
    pub total_gb: f64,
    pub used_gb: f64,
}

impl QuotaPeriod {
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.month as i32, self.year)
    }
}

/// Fractional hours between local midnight on the 1st and `now`.
pub fn hours_since_month_start(now: &NaiveDateTime) -> f64 {
    let elapsed = *now - start_of_month(now);
    elapsed.num_milliseconds() as f64 / 3_600_000.0
}

/// Project the period's metrics for `now` (local wall clock).
pub fn project_at(
    total_gb: f64,
    used_gb: f64,
    now: &NaiveDateTime,
    rounding: RoundingPolicy,
) -> Result<Projection, ProjectionError> {
    let period = QuotaPeriod {
        year: now.year(),
        month: now.month(),
        total_gb,
        used_gb,
    };
    project(&period, hours_since_month_start(now), rounding)
}

/// Project the period's metrics after `hours_elapsed` hours of the month.
pub fn project(
    period: &QuotaPeriod,
    hours_elapsed: f64,
    rounding: RoundingPolicy,
) -> Result<Projection, ProjectionError> {
    if !period.total_gb.is_finite() || period.total_gb <= 0.0 {
        return Err(ProjectionError::InvalidQuota(period.total_gb));
    }
    if !period.used_gb.is_finite() {
        return Err(ProjectionError::InvalidUsage(period.used_gb));
    }

    let days_in_month = period.days_in_month();
    let days_elapsed = hours_elapsed / 24.0;

    let gb_per_day_average = period.total_gb / days_in_month as f64;
    let gb_allowed_so_far = rounding.apply(gb_per_day_average * days_elapsed);
    let gb_left_to_use = period.total_gb - period.used_gb;
    let days_left_in_month = days_in_month as f64 - days_elapsed;

    if days_left_in_month <= 0.0 {
        return Err(ProjectionError::MonthBoundary {
            year: period.year,
            month: period.month,
        });
    }
    let gb_per_day_remaining = gb_left_to_use / days_left_in_month;

    Ok(Projection {
        year: period.year,
        month: period.month,
        days_in_month,
        hours_elapsed,
        days_left_in_month,
        gb_allowed_so_far,
        gb_left_to_use,
        gb_per_day_remaining,
        gb_per_day_average,
        gb_pace_difference: gb_allowed_so_far - period.used_gb,
        used_gb: period.used_gb,
        total_gb: period.total_gb,
    })
}
