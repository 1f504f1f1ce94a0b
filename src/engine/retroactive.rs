use chrono::NaiveDateTime;
use tracing::{info, instrument};

use super::error::AttendanceError;
use super::session::{AttendanceService, ClosedSession};
use super::time_window::retroactive_window;
use crate::model::attendance::{AttendanceRecord, RecordId};

/// Checks a user-supplied clock-out against a record, in order:
/// already closed, then ordering, then the `[work_date 20:00, next day 05:00)` window.
pub fn validate_retroactive_close(
    record: &AttendanceRecord,
    clock_out: NaiveDateTime,
) -> Result<(), AttendanceError> {
    if record.is_closed() {
        return Err(AttendanceError::AlreadyClosed(record.record_id));
    }

    if clock_out <= record.clock_in {
        return Err(AttendanceError::InvalidOrder {
            clock_in: record.clock_in,
            clock_out,
        });
    }

    let (from, until) = retroactive_window(record.work_date);
    if clock_out < from || clock_out >= until {
        return Err(AttendanceError::OutOfWindow {
            clock_out,
            from,
            until,
        });
    }

    Ok(())
}

impl AttendanceService {
    /// Supply the missing clock-out of the student's open or abandoned session.
    #[instrument(name = "retroactive_close", skip(self))]
    pub async fn retroactive_close(
        &self,
        record_id: RecordId,
        student_id: &str,
        clock_out: NaiveDateTime,
    ) -> Result<ClosedSession, AttendanceError> {
        let record = self
            .store
            .find_record(record_id, student_id)
            .await?
            .ok_or(AttendanceError::NotFound(record_id))?;

        validate_retroactive_close(&record, clock_out)?;

        // a correction may only record a clock-out that has already happened
        let now = self.clock.now();
        if clock_out > now {
            return Err(AttendanceError::InFuture { clock_out, now });
        }

        let previous_state = record.state;
        let closed = self
            .close_record(record, clock_out)
            .await?
            .ok_or(AttendanceError::AlreadyClosed(record_id))?;

        info!(record_id, %previous_state, "Retroactive close-out applied");
        Ok(closed)
    }
}
