use std::collections::HashSet;

use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::overtime::compute_overtime_minutes;
use crate::engine::time_window::is_overnight;
use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Level {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Sum of overtime over closed sessions, in minutes.
    TotalOvertime,
    /// Clock-ins before 09:30.
    EarlyBird,
    /// Clock-outs at or after 23:30, or past midnight.
    NightKnight,
    /// Closed sessions of at least 13 hours.
    LongDay,
    /// Clock-outs past midnight at or after 02:00.
    Kurapika,
}

#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub level: Level,
    pub rule: Rule,
    pub threshold: i64,
}

pub const CATALOG: [Achievement; 8] = [
    Achievement {
        id: 1,
        title: "First Steps",
        description: "Log one hour of overtime",
        level: Level::Bronze,
        rule: Rule::TotalOvertime,
        threshold: 60,
    },
    Achievement {
        id: 2,
        title: "Early Bird",
        description: "Clock in before 09:30",
        level: Level::Bronze,
        rule: Rule::EarlyBird,
        threshold: 1,
    },
    Achievement {
        id: 3,
        title: "Night Knight",
        description: "Clock out after 23:30",
        level: Level::Bronze,
        rule: Rule::NightKnight,
        threshold: 1,
    },
    Achievement {
        id: 4,
        title: "Long Haul",
        description: "Work 13 hours in a single session",
        level: Level::Silver,
        rule: Rule::LongDay,
        threshold: 1,
    },
    Achievement {
        id: 5,
        title: "Iron Liver",
        description: "Log 50 hours of overtime",
        level: Level::Silver,
        rule: Rule::TotalOvertime,
        threshold: 3_000,
    },
    Achievement {
        id: 6,
        title: "Kurapika",
        description: "Clock out after 02:00",
        level: Level::Silver,
        rule: Rule::Kurapika,
        threshold: 1,
    },
    Achievement {
        id: 7,
        title: "Hundred Nights",
        description: "Log 100 hours of overtime",
        level: Level::Gold,
        rule: Rule::TotalOvertime,
        threshold: 6_000,
    },
    Achievement {
        id: 8,
        title: "Lab Emperor",
        description: "Log 1000 hours of overtime",
        level: Level::Gold,
        rule: Rule::TotalOvertime,
        threshold: 60_000,
    },
];

pub fn find(id: u32) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Value of `rule` over a student's history. Overtime is recomputed from
/// the timestamps, never read from a stored column.
pub fn measure(rule: Rule, records: &[AttendanceRecord]) -> i64 {
    let closed = records
        .iter()
        .filter_map(|r| r.clock_out.map(|out| (r, out)));

    match rule {
        Rule::TotalOvertime => closed
            .map(|(r, out)| compute_overtime_minutes(r.clock_in, out, r.work_date))
            .sum(),
        Rule::EarlyBird => records
            .iter()
            .filter(|r| minute_of_day(r.clock_in.time()) < 9 * 60 + 30)
            .count() as i64,
        Rule::NightKnight => closed
            .filter(|(r, out)| {
                minute_of_day(out.time()) >= 23 * 60 + 30 || is_overnight(r.work_date, *out)
            })
            .count() as i64,
        Rule::LongDay => closed
            .filter(|(r, out)| (*out - r.clock_in).num_minutes() >= 13 * 60)
            .count() as i64,
        Rule::Kurapika => closed
            .filter(|(r, out)| is_overnight(r.work_date, *out) && out.hour() >= 2)
            .count() as i64,
    }
}

/// Catalog ids whose rule now holds and which are not in `earned`.
pub fn newly_earned(records: &[AttendanceRecord], earned: &HashSet<u32>) -> Vec<u32> {
    CATALOG
        .iter()
        .filter(|a| !earned.contains(&a.id))
        .filter(|a| measure(a.rule, records) >= a.threshold)
        .map(|a| a.id)
        .collect()
}
