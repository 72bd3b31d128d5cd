use chrono::{DateTime, NaiveDate, Utc};

/// Whole minutes between two instants, with leftover seconds rounded
/// half-up. A 90 second stretch counts as 2 minutes.
pub fn elapsed_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let seconds = (end - start).num_seconds().max(0);
    ((seconds + 30) / 60) as u32
}

/// First and last calendar day of a month. Returns None for an impossible
/// year/month combination.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    Some((first, last))
}
