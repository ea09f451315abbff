use colored::{control, ColoredString, Colorize};

use crate::core::formatter::{
    format_gb, format_projection_error, format_quota_bar, format_report, format_used_percent,
};
use crate::core::models::history::ChartData;
use crate::core::models::projection::Projection;
use crate::core::projector::ProjectionError;

const BAR_WIDTH: usize = 24;

/// Render the report block as a colored (or plain) string.
///
/// Layout:
/// ```text
///  Bandwidth (etcd at 10.0.0.5:2379)
///   Fractional days left in month:             15.000   (Days this month: 30)
///   Cumulative bandwidth allowed up to today:  615 GB   (Used / Differential / Left: 600 / 15 / 629 GB)
///   Bandwidth per day remaining:               41.933 GB   (Daily average: 40.967 GB)
///   Quota     49% of quota used [████████████░░░░░░░░░░░░]
/// ```
pub fn render_report(projection: &Projection, location: &str, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(" Bandwidth ({})", location).bold().to_string());

    let report = format_report(projection);
    for (i, line) in report.lines().enumerate() {
        let styled = match i {
            1 => color_by_pace(projection, line),
            2 => color_by_per_day(projection, line),
            _ => line.normal(),
        };
        lines.push(format!("  {}", styled));
    }

    let percent = format_used_percent(projection.used_gb, projection.total_gb);
    let bar = format_quota_bar(projection.used_gb, projection.total_gb, BAR_WIDTH);
    lines.push(format!(
        "  {}     {} {}",
        "Quota".cyan(),
        percent,
        bar.magenta()
    ));

    lines.join("\n")
}

/// Render a projection failure in place of the report.
pub fn render_projection_error(err: &ProjectionError, location: &str, use_color: bool) -> String {
    control::set_override(use_color);
    format!(
        "{}\n  {}",
        format!(" Bandwidth ({})", location).bold(),
        format_projection_error(err).yellow()
    )
}

/// Render the history as a table of days plus the resolved axis range.
pub fn render_chart(data: &ChartData, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(" History (per-day remaining)".bold().to_string());

    if data.points.is_empty() {
        lines.push(format!("  {}", "No days recorded this month".dimmed()));
    }
    for point in &data.points {
        lines.push(format!("  {}   {:>9.3} GB", point.label.cyan(), point.value));
    }

    lines.push(format!(
        "  {}     {} .. {} GB",
        "Range".cyan(),
        format_gb(data.bounds.min),
        format_gb(data.bounds.max)
    ));
    if let Some(min) = data.corrected_min {
        lines.push(format!(
            "  {}",
            format!("Lower range reset to {} (must not exceed the lowest value)", format_gb(min))
                .yellow()
        ));
    }
    if let Some(max) = data.corrected_max {
        lines.push(format!(
            "  {}",
            format!("Upper range reset to {} (must not be below the highest value)", format_gb(max))
                .yellow()
        ));
    }
    if !data.ticks.is_empty() {
        let ticks: Vec<&str> = data.ticks.iter().map(|t| t.label.as_str()).collect();
        lines.push(format!("  {}     {}", "Ticks".cyan(), ticks.join(" ").dimmed()));
    }

    lines.join("\n")
}

/// Green when usage is at or under the allowance so far, red when over.
fn color_by_pace(projection: &Projection, text: &str) -> ColoredString {
    if projection.gb_pace_difference >= 0.0 {
        text.green()
    } else {
        text.red()
    }
}

/// Green/yellow/red by how today's per-day budget compares to the average.
fn color_by_per_day(projection: &Projection, text: &str) -> ColoredString {
    let ratio = projection.gb_per_day_remaining / projection.gb_per_day_average;
    if ratio >= 1.0 {
        text.green()
    } else if ratio >= 0.75 {
        text.yellow()
    } else {
        text.red()
    }
}
