use chrono::{NaiveDate, NaiveDateTime};

use super::time_window::{is_weekend, standard_window};

fn floor_minutes(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    // num_minutes truncates toward zero; div_euclid keeps negative spans floored too
    (to - from).num_seconds().div_euclid(60)
}

/// Whole minutes between clock-in and clock-out, rounded down.
///
/// Callers guarantee `clock_out > clock_in`.
pub fn compute_work_minutes(clock_in: NaiveDateTime, clock_out: NaiveDateTime) -> i64 {
    floor_minutes(clock_in, clock_out)
}

/// Overtime minutes for a session attributed to `work_date`.
///
/// Weekends count every worked minute. On weekdays only time before 10:00
/// and after 20:00 of the work date counts; the late side keeps accruing
/// past midnight, so an overnight session is credited in full after 20:00.
pub fn compute_overtime_minutes(
    clock_in: NaiveDateTime,
    clock_out: NaiveDateTime,
    work_date: NaiveDate,
) -> i64 {
    if is_weekend(work_date) {
        return compute_work_minutes(clock_in, clock_out).max(0);
    }

    let (start, end) = standard_window(work_date);
    let mut overtime = 0;

    if clock_in < start {
        let early_end = clock_out.min(start);
        overtime += floor_minutes(clock_in, early_end).max(0);
    }

    if clock_out > end {
        let late_start = clock_in.max(end);
        overtime += floor_minutes(late_start, clock_out).max(0);
    }

    overtime
}

/// Derived minutes for a closed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMinutes {
    pub work: i64,
    pub overtime: i64,
}

impl SessionMinutes {
    pub fn compute(clock_in: NaiveDateTime, clock_out: NaiveDateTime, work_date: NaiveDate) -> Self {
        Self {
            work: compute_work_minutes(clock_in, clock_out),
            overtime: compute_overtime_minutes(clock_in, clock_out, work_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    // 2025-01-08 is a Wednesday, 2025-01-11 a Saturday
    fn wed() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekday_inside_window_has_no_overtime() {
        let m = SessionMinutes::compute(at(wed(), 10, 30), at(wed(), 18, 0), wed());
        assert_eq!(m, SessionMinutes { work: 450, overtime: 0 });
    }

    #[test]
    fn weekday_early_and_late_are_summed() {
        let m = SessionMinutes::compute(at(wed(), 9, 0), at(wed(), 21, 30), wed());
        assert_eq!(m.work, 750);
        assert_eq!(m.overtime, 60 + 90);
    }

    #[test]
    fn weekend_counts_everything() {
        let sat = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        let m = SessionMinutes::compute(at(sat, 11, 0), at(sat, 15, 0), sat);
        assert_eq!(m, SessionMinutes { work: 240, overtime: 240 });
    }

    #[test]
    fn overnight_session_accrues_past_midnight() {
        let thu = wed().succ_opt().unwrap();
        let m = SessionMinutes::compute(at(wed(), 20, 30), at(thu, 2, 0), wed());
        assert_eq!(m, SessionMinutes { work: 330, overtime: 330 });
    }

    #[test]
    fn overnight_from_friday_uses_weekday_policy() {
        // work date decides policy even when clock-out lands on Saturday
        let fri = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let sat = fri.succ_opt().unwrap();
        let m = SessionMinutes::compute(at(fri, 19, 0), at(sat, 1, 0), fri);
        assert_eq!(m.work, 360);
        assert_eq!(m.overtime, 300);
    }

    #[test]
    fn early_only_session_ends_before_window() {
        let m = SessionMinutes::compute(at(wed(), 7, 0), at(wed(), 9, 45), wed());
        assert_eq!(m, SessionMinutes { work: 165, overtime: 165 });
    }

    #[test]
    fn sub_minute_noise_is_floored() {
        let clock_in = at(wed(), 19, 58) + Duration::seconds(30);
        let clock_out = at(wed(), 20, 1) + Duration::seconds(59);
        assert_eq!(compute_work_minutes(clock_in, clock_out), 3);
        assert_eq!(compute_overtime_minutes(clock_in, clock_out, wed()), 1);
    }

    #[test]
    fn overtime_is_bounded_by_work_minutes() {
        // every pair of quarter-hour marks across two days, weekday and weekend
        let days = [wed(), NaiveDate::from_ymd_opt(2025, 1, 12).unwrap()];
        for day in days {
            let marks: Vec<NaiveDateTime> = (0..(48 * 4))
                .map(|q| day.and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(15 * q))
                .collect();
            for (i, clock_in) in marks.iter().enumerate() {
                for clock_out in &marks[i + 1..] {
                    let m = SessionMinutes::compute(*clock_in, *clock_out, day);
                    assert!(m.overtime >= 0, "{clock_in} -> {clock_out}");
                    assert!(m.overtime <= m.work, "{clock_in} -> {clock_out}");
                }
            }
        }
    }
}
