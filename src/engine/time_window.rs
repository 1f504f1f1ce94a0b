use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Weekday,
};

/// Hour the standard work window opens (org local).
pub const WINDOW_START_HOUR: i64 = 10;
/// Hour the standard work window closes (org local).
pub const WINDOW_END_HOUR: i64 = 20;
/// Retroactive clock-outs must fall before this hour on the day after the work date.
pub const RETRO_CUTOFF_HOUR: i64 = 5;

fn at_hour(date: NaiveDate, hour: i64) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 10:00:00 and 20:00:00 on `date`.
pub fn standard_window(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (at_hour(date, WINDOW_START_HOUR), at_hour(date, WINDOW_END_HOUR))
}

/// Half-open range `[date 20:00, date+1 05:00)` accepted for retroactive close-out.
pub fn retroactive_window(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let (_, end) = standard_window(date);
    (end, at_hour(date, 24 + RETRO_CUTOFF_HOUR))
}

/// True when clock-out falls on a later calendar date than the work date.
pub fn is_overnight(work_date: NaiveDate, clock_out: NaiveDateTime) -> bool {
    clock_out.date() > work_date
}

/// Render an org-local wall-clock value as an unambiguous instant.
pub fn to_instant(local: NaiveDateTime, tz: FixedOffset) -> DateTime<FixedOffset> {
    tz.from_utc_datetime(&(local - tz))
}

/// Convert an instant in any offset into org-local wall-clock.
pub fn to_local(instant: DateTime<FixedOffset>, tz: FixedOffset) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Next org-local occurrence of `hour:00:00` strictly after `now`.
pub fn next_daily_run(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let today = at_hour(now.date(), i64::from(hour.min(23)));
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
