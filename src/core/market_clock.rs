// Market Clock - UTC to US Eastern market local time
// Regular session runs 09:30-16:00 America/New_York

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

/// Regular session open, local market time
pub const MARKET_OPEN_HOUR: u32 = 9;
pub const MARKET_OPEN_MINUTE: u32 = 30;

const EST_OFFSET_HOURS: i64 = -5;
const EDT_OFFSET_HOURS: i64 = -4;

/// US daylight saving: second Sunday of March 02:00 local to first Sunday of November 02:00 local
fn is_us_dst(ts: DateTime<Utc>) -> Option<bool> {
    let year = ts.year();
    let dst_start_day = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)?;
    let dst_end_day = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)?;

    // 02:00 EST == 07:00 UTC, 02:00 EDT == 06:00 UTC
    let dst_start = dst_start_day.and_hms_opt(7, 0, 0)?.and_utc();
    let dst_end = dst_end_day.and_hms_opt(6, 0, 0)?.and_utc();

    Some(ts >= dst_start && ts < dst_end)
}

/// Convert a UTC timestamp to naive US Eastern local time
pub fn market_time(ts: DateTime<Utc>) -> Option<NaiveDateTime> {
    let offset = if is_us_dst(ts)? { EDT_OFFSET_HOURS } else { EST_OFFSET_HOURS };
    Some(ts.naive_utc() + Duration::hours(offset))
}

/// Regular session open on the market-local date of `ts`
pub fn session_open(ts: DateTime<Utc>) -> Option<NaiveDateTime> {
    let local = market_time(ts)?;
    let open = NaiveTime::from_hms_opt(MARKET_OPEN_HOUR, MARKET_OPEN_MINUTE, 0)?;
    Some(local.date().and_time(open))
}

/// Seconds elapsed since the regular open on the same market-local day (negative before the open)
pub fn seconds_since_open(ts: DateTime<Utc>) -> Option<i64> {
    let local = market_time(ts)?;
    let open = session_open(ts)?;
    Some((local - open).num_seconds())
}
