use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Number of days in `month` of `year`.
///
/// February uses the plain `year % 4` leap rule (no century exceptions).
/// Anything outside 1-12 falls through to 30 days.
pub fn days_in_month(month: i32, year: i32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        2 if year % 4 == 0 => 29,
        2 => 28,
        _ => 30,
    }
}

/// Local midnight on the first day of the month containing `now`.
pub fn start_of_month(now: &NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(*now)
}

/// Zero-padded two-digit day label ("01".."31").
pub fn day_label(day: u32) -> String {
    format!("{:02}", day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_one_day_months() {
        for month in [1, 3, 5, 7, 8, 10, 12] {
            assert_eq!(days_in_month(month, 2023), 31, "month {}", month);
        }
        assert_eq!(days_in_month(12, 2023), 31);
    }

    #[test]
    fn thirty_day_months() {
        for month in [4, 6, 9, 11] {
            assert_eq!(days_in_month(month, 2023), 30, "month {}", month);
        }
    }

    #[test]
    fn february_leap_rule() {
        assert_eq!(days_in_month(2, 2023), 28);
        assert_eq!(days_in_month(2, 2024), 29);
        // simplified rule: centuries are still leap years
        assert_eq!(days_in_month(2, 1900), 29);
        assert_eq!(days_in_month(2, 2100), 29);
    }

    #[test]
    fn out_of_range_months_default_to_thirty() {
        assert_eq!(days_in_month(0, 2023), 30);
        assert_eq!(days_in_month(13, 2023), 30);
        assert_eq!(days_in_month(-6, 2023), 30);
        assert_eq!(days_in_month(6, -2023), 30);
    }

    #[test]
    fn start_of_month_is_midnight_on_the_first() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 17)
            .unwrap()
            .and_hms_opt(13, 45, 2)
            .unwrap();
        let start = start_of_month(&now);
        assert_eq!(
            start,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn day_label_pads() {
        assert_eq!(day_label(1), "01");
        assert_eq!(day_label(9), "09");
        assert_eq!(day_label(10), "10");
        assert_eq!(day_label(31), "31");
    }
}
