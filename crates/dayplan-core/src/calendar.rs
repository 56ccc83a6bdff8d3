//! Month strip for the calendar view: every day of a month with its
//! day-of-month number and short weekday label. Pure functions of the
//! (year, month) pair; tasks never enter into it.

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub day: u32,
    /// Short English weekday label, `Mon` through `Sun`.
    pub weekday: String,
    pub date: NaiveDate,
}

#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    if !(1..=12).contains(&month) {
        return 0;
    }
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

/// Every day of the given month, in order. An invalid month yields an
/// empty strip rather than an error; the callers rendering it already
/// validated their input.
#[must_use]
pub fn month_grid(year: i32, month: u32) -> Vec<CalendarDay> {
    (1..=days_in_month(year, month))
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| CalendarDay {
            day: date.day(),
            weekday: date.format("%a").to_string(),
            date,
        })
        .collect()
}

/// `"March 2024"`-style header text.
#[must_use]
pub fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.format("%B %Y").to_string())
        .unwrap_or_default()
}

/// Month paging with year wrap-around; `delta` may be negative.
#[must_use]
pub fn add_months(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + delta;
    let wrapped_month = zero_based.rem_euclid(12) as u32 + 1;
    (zero_based.div_euclid(12), wrapped_month)
}

#[cfg(test)]
mod tests {
    use super::{add_months, days_in_month, month_grid, month_label};

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 0), 0);
        assert_eq!(days_in_month(2024, 13), 0);
    }

    #[test]
    fn grid_covers_the_whole_month_in_order() {
        let grid = month_grid(2024, 3);
        assert_eq!(grid.len(), 31);
        assert_eq!(grid[0].day, 1);
        assert_eq!(grid[0].weekday, "Fri");
        assert_eq!(grid[30].day, 31);
        assert_eq!(grid[30].date.to_string(), "2024-03-31");
    }

    #[test]
    fn invalid_month_yields_an_empty_grid() {
        assert!(month_grid(2024, 13).is_empty());
        assert!(month_grid(2024, 0).is_empty());
    }

    #[test]
    fn label_formats_month_and_year() {
        assert_eq!(month_label(2024, 3), "March 2024");
        assert_eq!(month_label(2024, 12), "December 2024");
    }

    #[test]
    fn paging_wraps_across_years() {
        assert_eq!(add_months(2024, 12, 1), (2025, 1));
        assert_eq!(add_months(2024, 1, -1), (2023, 12));
        assert_eq!(add_months(2024, 6, 0), (2024, 6));
        assert_eq!(add_months(2024, 6, -18), (2022, 12));
    }
}
