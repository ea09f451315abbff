use std::collections::BTreeMap;

use crate::core::calendar::day_label;
use crate::core::models::history::{ChartPoint, DailySample};

/// Every recorded day holding a number, ordered by day. Unlike the chart
/// series, holes do not end the list, so the last element is the most
/// recent real sample.
pub fn recorded_days(history: &BTreeMap<String, String>) -> Vec<ChartPoint> {
    let mut days: Vec<(u32, f64)> = history
        .iter()
        .filter_map(|(label, raw)| {
            let day = label.trim().parse::<u32>().ok()?;
            let value = raw.trim().parse::<f64>().ok()?;
            Some((day, value))
        })
        .filter(|(day, value)| (1..=31).contains(day) && value.is_finite())
        .collect();
    days.sort_by_key(|(day, _)| *day);
    days.into_iter()
        .map(|(day, value)| ChartPoint {
            label: day_label(day),
            value,
        })
        .collect()
}

/// Samples to persist for today, oldest first.
///
/// When the last recorded day is more than one day before `today`, every
/// skipped day gets a value interpolated linearly between the last recorded
/// value and `today_value`. Today's real sample is always the last element.
/// With no recorded history, or a last label that is not a day number,
/// nothing is interpolated.
pub fn fill_gaps(recorded: &[ChartPoint], today: u32, today_value: f64) -> Vec<DailySample> {
    let mut samples = interpolate_missing(recorded, today, today_value);
    samples.push(DailySample {
        day: today,
        value: today_value,
        interpolated: false,
    });
    samples
}

fn interpolate_missing(
    recorded: &[ChartPoint],
    today: u32,
    today_value: f64,
) -> Vec<DailySample> {
    let Some(last) = recorded.last() else {
        return Vec::new();
    };
    let Ok(last_day) = last.label.trim().parse::<u32>() else {
        tracing::debug!(
            label = %last.label,
            "last history label is not a day, skipping gap fill"
        );
        return Vec::new();
    };
    if today <= last_day {
        return Vec::new();
    }

    let gap = today - last_day;
    if gap < 2 {
        return Vec::new();
    }

    let step = (today_value - last.value) / gap as f64;
    tracing::debug!(last_day, today, step, "interpolating missed days");
    (1..gap)
        .map(|i| DailySample {
            day: last_day + i,
            value: last.value + step * i as f64,
            interpolated: true,
        })
        .collect()
}
