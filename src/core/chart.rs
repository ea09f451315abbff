use std::collections::BTreeMap;

use crate::core::calendar::day_label;
use crate::core::models::history::{AxisTick, ChartBounds, ChartData, ChartPoint};

const MAX_TICKS: usize = 200;

/// User-requested y-axis range, either side optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundsOverride {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Collect the month's history as chart points.
///
/// Days are read "01", "02", ... in order. Days before the first recorded
/// one are skipped; after that, collection stops at the first day that is
/// missing or does not hold a number.
pub fn collect_points(values: &BTreeMap<String, String>) -> Vec<ChartPoint> {
    let mut points = Vec::new();
    for day in 1..=31 {
        let label = day_label(day);
        let Some(raw) = values.get(&label) else {
            if points.is_empty() {
                continue;
            }
            break;
        };
        match raw.trim().parse::<f64>() {
            Ok(value) => points.push(ChartPoint { label, value }),
            Err(_) => {
                tracing::warn!(day = %label, value = %raw, "stored history value is not a number");
                break;
            }
        }
    }
    points
}

/// Smallest and largest value, or `0.0..0.0` when there are none.
pub fn min_max(values: &[f64]) -> ChartBounds {
    let mut iter = values.iter().copied();
    let Some(first) = iter.next() else {
        return ChartBounds { min: 0.0, max: 0.0 };
    };
    let start = ChartBounds {
        min: first,
        max: first,
    };
    iter.fold(start, |b, v| ChartBounds {
        min: b.min.min(v),
        max: b.max.max(v),
    })
}

/// Apply a user override to the natural bounds.
///
/// A min is accepted only at or below the natural min, a max only at or
/// above the natural max. Negative mins are floored at zero unless the
/// data itself goes negative. Returns the bounds plus the corrected value
/// for each side whose request was replaced.
pub fn resolve_bounds(
    natural: ChartBounds,
    requested: BoundsOverride,
) -> (ChartBounds, Option<f64>, Option<f64>) {
    let (min, corrected_min) = match requested.min {
        Some(m) if m.is_finite() && m <= natural.min => {
            let floor = natural.min.min(0.0);
            if m < floor {
                (floor, Some(floor))
            } else {
                (m, None)
            }
        }
        Some(_) => (natural.min, Some(natural.min)),
        None => (natural.min, None),
    };
    let (max, corrected_max) = match requested.max {
        Some(m) if m.is_finite() && m >= natural.max => (m, None),
        Some(_) => (natural.max, Some(natural.max)),
        None => (natural.max, None),
    };
    (ChartBounds { min, max }, corrected_min, corrected_max)
}

/// Tick spacing for a y-axis spanning `bounds`.
pub fn tick_step(bounds: ChartBounds) -> f64 {
    let span = bounds.max - bounds.min;
    if span <= 5.0 {
        0.5
    } else if span >= 25.0 {
        5.0
    } else {
        1.0
    }
}

/// Every multiple of the tick step inside `bounds`, capped at `MAX_TICKS`.
pub fn axis_ticks(bounds: ChartBounds) -> Vec<AxisTick> {
    let step = tick_step(bounds);
    let first = (bounds.min / step).ceil() as i64;
    let last = (bounds.max / step).floor() as i64;
    (first..=last)
        .map(|k| {
            let value = k as f64 * step;
            AxisTick {
                value,
                label: format!("{:.1}", value),
            }
        })
        .take(MAX_TICKS)
        .collect()
}

/// Build the full chart view of the stored history.
pub fn prepare(values: &BTreeMap<String, String>, requested: BoundsOverride) -> ChartData {
    let points = collect_points(values);
    let raw: Vec<f64> = points.iter().map(|p| p.value).collect();
    let natural = min_max(&raw);
    let (bounds, corrected_min, corrected_max) = resolve_bounds(natural, requested);
    let ticks = axis_ticks(bounds);

    ChartData {
        points,
        natural,
        bounds,
        corrected_min,
        corrected_max,
        ticks,
    }
}
