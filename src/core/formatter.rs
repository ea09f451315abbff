use crate::core::models::projection::Projection;
use crate::core::projector::ProjectionError;

/// Label column width shared by every report line.
const LABEL_WIDTH: usize = 43;

/// Returns the three-line report for a projection:
///
/// ```text
/// Fractional days left in month:             15.000   (Days this month: 30)
/// Cumulative bandwidth allowed up to today:  615 GB   (Used / Differential / Left: 600 / 15 / 629 GB)
/// Bandwidth per day remaining:               41.933 GB   (Daily average: 40.967 GB)
/// ```
pub fn format_report(projection: &Projection) -> String {
    [
        format_days_line(projection),
        format_allowance_line(projection),
        format_per_day_line(projection),
    ]
    .join("\n")
}

pub fn format_days_line(p: &Projection) -> String {
    format!(
        "{:<width$}{:.3}   (Days this month: {})",
        "Fractional days left in month:",
        p.days_left_in_month,
        p.days_in_month,
        width = LABEL_WIDTH
    )
}

pub fn format_allowance_line(p: &Projection) -> String {
    format!(
        "{:<width$}{} GB   (Used / Differential / Left: {} / {} / {} GB)",
        "Cumulative bandwidth allowed up to today:",
        format_gb(p.gb_allowed_so_far),
        format_gb(p.used_gb),
        format_gb(p.gb_pace_difference),
        format_gb(p.gb_left_to_use),
        width = LABEL_WIDTH
    )
}

pub fn format_per_day_line(p: &Projection) -> String {
    format!(
        "{:<width$}{:.3} GB   (Daily average: {:.3} GB)",
        "Bandwidth per day remaining:",
        p.gb_per_day_remaining,
        p.gb_per_day_average,
        width = LABEL_WIDTH
    )
}

/// Shortest decimal form of an amount, at most three decimals ("615", "39.65").
pub fn format_gb(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// Message shown in place of the report when the projection cannot be computed.
pub fn format_projection_error(err: &ProjectionError) -> String {
    match err {
        ProjectionError::MonthBoundary { .. } => format!(
            "{}. The billing month has ended; per-day figures resume next month.",
            err
        ),
        _ => err.to_string(),
    }
}

/// Returns "[████████░░░░]" where █ = quota still available, ░ = quota used.
/// Usage beyond the quota renders as a fully empty bar.
pub fn format_quota_bar(used_gb: f64, total_gb: f64, width: usize) -> String {
    let used_percent = if total_gb > 0.0 {
        (used_gb / total_gb * 100.0).clamp(0.0, 100.0)
    } else {
        100.0
    };
    let used_blocks = ((used_percent / 100.0) * width as f64).round() as usize;
    let remaining_blocks = width.saturating_sub(used_blocks);

    let filled: String = "█".repeat(remaining_blocks);
    let empty: String = "░".repeat(used_blocks);

    format!("[{}{}]", filled, empty)
}

/// Returns "{used}% of quota used", rounded to the nearest integer.
pub fn format_used_percent(used_gb: f64, total_gb: f64) -> String {
    let percent = if total_gb > 0.0 {
        (used_gb / total_gb * 100.0).max(0.0).round() as u64
    } else {
        0
    };
    format!("{}% of quota used", percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projector::{project, QuotaPeriod, RoundingPolicy};

    fn june_projection() -> Projection {
        let period = QuotaPeriod {
            year: 2023,
            month: 6,
            total_gb: 1229.0,
            used_gb: 600.0,
        };
        project(&period, 15.0 * 24.0, RoundingPolicy::Decimals(1)).unwrap()
    }

    #[test]
    fn report_has_three_lines_with_required_facts() {
        let text = format_report(&june_projection());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        assert!(lines[0].contains("15.000"));
        assert!(lines[0].contains("Days this month: 30"));

        assert!(lines[1].contains("614.5 GB"));
        assert!(lines[1].contains("600 / 14.5 / 629 GB"));

        assert!(lines[2].contains("41.933 GB"));
        assert!(lines[2].contains("40.967 GB"));
    }

    #[test]
    fn report_columns_line_up() {
        let text = format_report(&june_projection());
        let starts: Vec<usize> = text
            .lines()
            .map(|l| l.find(|c: char| c.is_ascii_digit()).unwrap())
            .collect();
        assert!(starts.iter().all(|s| *s == LABEL_WIDTH), "{:?}", starts);
    }

    #[test]
    fn negative_left_is_shown() {
        let period = QuotaPeriod {
            year: 2023,
            month: 6,
            total_gb: 100.0,
            used_gb: 150.0,
        };
        let p = project(&period, 24.0, RoundingPolicy::WholeGb).unwrap();
        assert!(format_allowance_line(&p).contains("150 / -147 / -50 GB"));
        assert!(format_per_day_line(&p).contains("-1.724 GB"));
    }

    #[test]
    fn format_gb_trims_trailing_zeros() {
        assert_eq!(format_gb(615.0), "615");
        assert_eq!(format_gb(39.65), "39.65");
        assert_eq!(format_gb(41.93333), "41.933");
        assert_eq!(format_gb(-0.0001), "0");
        assert_eq!(format_gb(-50.0), "-50");
    }

    #[test]
    fn month_boundary_message_is_distinct() {
        let err = ProjectionError::MonthBoundary {
            year: 2023,
            month: 6,
        };
        let msg = format_projection_error(&err);
        assert!(msg.contains("undefined"));
        assert!(!msg.contains("inf"));
        assert!(!msg.contains("NaN"));
    }

    #[test]
    fn quota_bar_width() {
        assert_eq!(format_quota_bar(0.0, 100.0, 12), "[████████████]");
        assert_eq!(format_quota_bar(100.0, 100.0, 12), "[░░░░░░░░░░░░]");
        assert_eq!(format_quota_bar(50.0, 100.0, 12), "[██████░░░░░░]");
        assert_eq!(format_quota_bar(250.0, 100.0, 12), "[░░░░░░░░░░░░]");
    }

    #[test]
    fn used_percent_rounds() {
        assert_eq!(format_used_percent(600.0, 1229.0), "49% of quota used");
        assert_eq!(format_used_percent(0.0, 100.0), "0% of quota used");
        assert_eq!(format_used_percent(130.0, 100.0), "130% of quota used");
    }
}
