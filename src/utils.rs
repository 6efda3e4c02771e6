use chrono::{DateTime, Days, FixedOffset, NaiveDate};

use crate::error::HrError;

/// First and last calendar day of a month
pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), HrError> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Err(HrError::InvalidInput(format!("{year}-{month:02} is not a valid month")))
    };

    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| HrError::InvalidInput(format!("{year}-{month:02} is out of range")))?;

    Ok((first, last))
}

/// Every calendar day from `start` to `end`, both inclusive
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.checked_add_days(Days::new(1)))
        .take_while(move |d| *d <= end)
}

/// Hours elapsed between two instants, rounded to two decimals and never negative
pub fn hours_between(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    let seconds = (*end - *start).num_seconds().max(0);

    round2(seconds as f64 / 3600.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Local, TimeZone as _};

    #[test]
    fn test_month_range() {
        let (first, last) = month_range(2024, 2).unwrap();

        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, last) = month_range(2024, 12).unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        assert!(month_range(2024, 13).is_err());
    }

    #[test]
    fn test_days_between() {
        let start = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();

        assert_eq!(days_between(start, end).count(), 30);
        assert_eq!(days_between(end, start).count(), 0);
    }

    #[test]
    fn test_hours_between() {
        let check_in = Local.with_ymd_and_hms(2023, 10, 10, 8, 30, 0).unwrap().fixed_offset();
        let check_out = Local.with_ymd_and_hms(2023, 10, 10, 17, 10, 0).unwrap().fixed_offset();

        assert_eq!(hours_between(&check_in, &check_out), 8.67);
        assert_eq!(hours_between(&check_out, &check_in), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(30000.0 - 2.0 * (30000.0 / 26.0)), 27692.31);
        assert_eq!(round2(8.666_666), 8.67);
    }
}
