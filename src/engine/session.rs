use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::error::{AttendanceError, StoreError};
use super::overtime::SessionMinutes;
use super::store::{AchievementCheck, Clock, RecordStore};
use crate::model::attendance::{AttendanceRecord, SessionState};

/// Bound on read/decide/write rounds when concurrent actions keep winning.
const MAX_CLOCK_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct SweepPolicy {
    /// Open sessions younger than this survive the sweep.
    pub grace: Duration,
    pub batch_size: usize,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::hours(1),
            batch_size: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClockActionKind {
    ClockIn,
    ClockOut,
}

/// A record that just transitioned to closed.
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub record: AttendanceRecord,
    pub minutes: SessionMinutes,
    /// `None` when the achievement check failed.
    pub new_achievements: Option<Vec<u32>>,
}

#[derive(Debug, Clone)]
pub struct ClockOutcome {
    pub action: ClockActionKind,
    pub record: AttendanceRecord,
    pub minutes: Option<SessionMinutes>,
    pub new_achievements: Option<Vec<u32>>,
}

impl From<ClosedSession> for ClockOutcome {
    fn from(closed: ClosedSession) -> Self {
        ClockOutcome {
            action: ClockActionKind::ClockOut,
            record: closed.record,
            minutes: Some(closed.minutes),
            new_achievements: closed.new_achievements,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrentStatus {
    pub clocked_in: bool,
    /// The open session if any, otherwise the latest record.
    pub record: Option<AttendanceRecord>,
    /// Sessions waiting for a retroactive clock-out.
    pub abandoned: Vec<AttendanceRecord>,
}

/// Attendance state machine over an injected record store.
pub struct AttendanceService {
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) achievements: Arc<dyn AchievementCheck>,
    pub(super) sweep: SweepPolicy,
}

impl AttendanceService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        achievements: Arc<dyn AchievementCheck>,
        sweep: SweepPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            achievements,
            sweep,
        }
    }

    /// Single-button clock: closes the student's open session, or opens a new one.
    ///
    /// The open session is closed regardless of its work date, so a session
    /// started yesterday evening is closed by this morning's action.
    #[instrument(name = "clock_action", skip(self))]
    pub async fn clock_action(&self, student_id: &str) -> Result<ClockOutcome, AttendanceError> {
        for attempt in 1..=MAX_CLOCK_ATTEMPTS {
            let now = self.clock.now();

            if let Some(open) = self.store.find_open_session(student_id).await? {
                match self.close_record(open, now).await? {
                    Some(closed) => return Ok(closed.into()),
                    None => {
                        debug!(attempt, "open session closed concurrently, retrying");
                        continue;
                    }
                }
            }

            let work_date = now.date();
            match self
                .store
                .create_open_session(student_id, work_date, now)
                .await
            {
                Ok(record_id) => {
                    info!(record_id, %work_date, "Clocked in");
                    return Ok(ClockOutcome {
                        action: ClockActionKind::ClockIn,
                        record: AttendanceRecord {
                            record_id,
                            student_id: student_id.to_string(),
                            work_date,
                            clock_in: now,
                            clock_out: None,
                            work_minutes: None,
                            state: SessionState::Open,
                        },
                        minutes: None,
                        new_achievements: None,
                    });
                }
                Err(StoreError::Conflict) => {
                    debug!(attempt, "concurrent clock-in, treating action as clock-out");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!("Clock action kept conflicting with concurrent actions");
        Err(AttendanceError::Conflict {
            student_id: student_id.to_string(),
        })
    }

    /// Open session if any, otherwise the latest record, plus pending abandoned sessions.
    pub async fn get_open_or_latest(
        &self,
        student_id: &str,
    ) -> Result<CurrentStatus, AttendanceError> {
        let open = self.store.find_open_session(student_id).await?;
        let clocked_in = open.is_some();
        let record = match open {
            Some(record) => Some(record),
            None => self.store.latest_record(student_id).await?,
        };
        let abandoned = self.store.find_abandoned(student_id).await?;

        Ok(CurrentStatus {
            clocked_in,
            record,
            abandoned,
        })
    }

    pub async fn list_records(
        &self,
        student_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        Ok(self.store.list_records(student_id, from, to).await?)
    }

    /// Close `record` at `clock_out`, then run the achievement check.
    ///
    /// `Ok(None)` means the store saw the record already closed.
    pub(super) async fn close_record(
        &self,
        record: AttendanceRecord,
        clock_out: NaiveDateTime,
    ) -> Result<Option<ClosedSession>, AttendanceError> {
        if clock_out <= record.clock_in {
            return Err(AttendanceError::InvalidOrder {
                clock_in: record.clock_in,
                clock_out,
            });
        }

        let minutes = SessionMinutes::compute(record.clock_in, clock_out, record.work_date);
        let closed = self
            .store
            .close_session(record.record_id, clock_out, minutes.work, minutes.overtime)
            .await?;
        if !closed {
            return Ok(None);
        }

        info!(
            record_id = record.record_id,
            student_id = %record.student_id,
            work_minutes = minutes.work,
            overtime_minutes = minutes.overtime,
            "Session closed"
        );

        let new_achievements = match self.achievements.check_and_grant(&record.student_id).await {
            Ok(ids) => Some(ids),
            Err(e) => {
                warn!(error = %e, student_id = %record.student_id, "Achievement check failed");
                None
            }
        };

        Ok(Some(ClosedSession {
            record: AttendanceRecord {
                clock_out: Some(clock_out),
                work_minutes: Some(minutes.work),
                state: SessionState::Closed,
                ..record
            },
            minutes,
            new_achievements,
        }))
    }
}
