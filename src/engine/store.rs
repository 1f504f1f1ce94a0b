//! Collaborators the attendance engine is driven through.

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, SubsecRound, Utc};

use super::error::StoreError;
use crate::model::attendance::{AttendanceRecord, RecordId};

/// Durable attendance records.
///
/// Implementations enforce "at most one open session per student"
/// atomically with creation and make `close_session` / `mark_abandoned`
/// conditional on the current state.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert an open session. Returns `StoreError::Conflict` if the student
    /// already has one.
    async fn create_open_session(
        &self,
        student_id: &str,
        work_date: NaiveDate,
        clock_in: NaiveDateTime,
    ) -> Result<RecordId, StoreError>;

    /// Most recent open (not abandoned) session of the student.
    async fn find_open_session(
        &self,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Close an open or abandoned record. Returns false when it was already closed.
    async fn close_session(
        &self,
        record_id: RecordId,
        clock_out: NaiveDateTime,
        work_minutes: i64,
        overtime_minutes: i64,
    ) -> Result<bool, StoreError>;

    /// Flag an open record as abandoned. Returns false when it was no longer open.
    async fn mark_abandoned(&self, record_id: RecordId) -> Result<bool, StoreError>;

    async fn find_record(
        &self,
        record_id: RecordId,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// One page of open records whose clock-in predates `cutoff`, ordered by id.
    async fn scan_open_older_than(
        &self,
        cutoff: NaiveDateTime,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Latest record of any state, by work date then clock-in.
    async fn latest_record(&self, student_id: &str)
    -> Result<Option<AttendanceRecord>, StoreError>;

    async fn find_abandoned(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// History of a student, newest first, optionally bounded by work date (inclusive).
    async fn list_records(
        &self,
        student_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}

/// Source of "now" in organization-local wall-clock time.
///
/// Values are whole seconds, matching the precision of the stored `DATETIME` columns.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock {
    pub offset: FixedOffset,
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now()
            .with_timezone(&self.offset)
            .naive_local()
            .trunc_subsecs(0)
    }
}

/// Grants achievements after a session closes.
#[async_trait]
pub trait AchievementCheck: Send + Sync {
    /// Ids of achievements newly granted to the student.
    async fn check_and_grant(&self, student_id: &str) -> Result<Vec<u32>, StoreError>;
}
