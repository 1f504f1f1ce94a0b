use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

pub type RecordId = u64;

/// Lifecycle of one attendance record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Clocked in, no clock-out yet.
    Open,
    /// Swept by the daily reset; waiting for a retroactive clock-out.
    Abandoned,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub record_id: RecordId,
    pub student_id: String,
    /// Date of the clock-in, never moved even when clock-out lands on the next day.
    pub work_date: NaiveDate,
    pub clock_in: NaiveDateTime,
    pub clock_out: Option<NaiveDateTime>,
    /// Raw duration, present only once closed.
    pub work_minutes: Option<i64>,
    pub state: SessionState,
}

impl AttendanceRecord {
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }
}

/// Row as stored in `attendance_record`.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub record_id: u64,
    pub student_id: String,
    pub work_date: NaiveDate,
    pub clock_in: NaiveDateTime,
    pub clock_out: Option<NaiveDateTime>,
    pub work_minutes: Option<i32>,
    pub state: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            record_id: row.record_id,
            student_id: row.student_id,
            work_date: row.work_date,
            clock_in: row.clock_in,
            clock_out: row.clock_out,
            work_minutes: row.work_minutes.map(i64::from),
            state: row.state.parse()?,
        })
    }
}
