use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::error::AttendanceError;
use super::session::AttendanceService;
use super::time_window::next_daily_run;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Records transitioned from open to abandoned by this run.
    #[schema(example = 3)]
    pub processed_count: u64,
    /// Records whose mark failed; they stay open for the next run.
    #[schema(example = 0)]
    pub failed_count: u64,
}

impl AttendanceService {
    /// Mark every open session older than the grace period as abandoned.
    ///
    /// Clock-out is never touched. Works in id-ordered chunks; a failure on one
    /// record is logged and skipped, so re-running picks up whatever is left.
    pub async fn run_daily_sweep(&self) -> Result<SweepReport, AttendanceError> {
        let now = self.clock.now();
        let cutoff = now - self.sweep.grace;
        let batch_size = self.sweep.batch_size.max(1);

        info!(%cutoff, "Daily sweep starting");

        let mut report = SweepReport {
            processed_count: 0,
            failed_count: 0,
        };
        let mut after = None;

        loop {
            let page = self
                .store
                .scan_open_older_than(cutoff, after, batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.record_id);
            let exhausted = page.len() < batch_size;

            for record in page {
                match self.store.mark_abandoned(record.record_id).await {
                    Ok(true) => {
                        report.processed_count += 1;
                        info!(
                            record_id = record.record_id,
                            student_id = %record.student_id,
                            work_date = %record.work_date,
                            clock_in = %record.clock_in,
                            "Session marked abandoned"
                        );
                    }
                    // closed by the student between scan and mark
                    Ok(false) => {}
                    Err(e) => {
                        report.failed_count += 1;
                        error!(error = %e, record_id = record.record_id, "Failed to mark session abandoned");
                    }
                }
            }

            if exhausted {
                break;
            }
        }

        info!(
            processed = report.processed_count,
            failed = report.failed_count,
            "Daily sweep finished"
        );
        Ok(report)
    }
}

/// Run the sweep every day at `reset_hour` org-local time. Never returns.
pub async fn run_daily_sweep_loop(service: Arc<AttendanceService>, reset_hour: u32) {
    info!(reset_hour, "Daily sweep scheduler started");

    loop {
        let now = service.clock.now();
        let next = next_daily_run(now, reset_hour);
        actix_web::rt::time::sleep(until(now, next)).await;

        if let Err(e) = service.run_daily_sweep().await {
            error!(error = %e, "Daily sweep failed");
        }
    }
}

fn until(now: NaiveDateTime, next: NaiveDateTime) -> std::time::Duration {
    (next - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::SweepPolicy;
    use crate::engine::testing::{Harness, at, wed};
    use crate::model::attendance::{AttendanceRecord, SessionState};
    use chrono::Duration;

    fn open(student: &str, clock_in: NaiveDateTime) -> AttendanceRecord {
        AttendanceRecord {
            record_id: 0,
            student_id: student.to_string(),
            work_date: clock_in.date(),
            clock_in,
            clock_out: None,
            work_minutes: None,
            state: SessionState::Open,
        }
    }

    fn thu_5am() -> NaiveDateTime {
        at(wed().succ_opt().unwrap(), 5, 0)
    }

    #[actix_web::test]
    async fn marks_stale_open_sessions_only() {
        let h = Harness::new(thu_5am());
        let stale = h.store.insert(open("a", at(wed(), 21, 0)));
        let fresh = h.store.insert(open("b", thu_5am() - Duration::minutes(30)));
        let closed = h.store.insert(AttendanceRecord {
            clock_out: Some(at(wed(), 18, 0)),
            work_minutes: Some(480),
            state: SessionState::Closed,
            ..open("c", at(wed(), 10, 0))
        });

        let report = h.service().run_daily_sweep().await.unwrap();
        assert_eq!(report.processed_count, 1);
        assert_eq!(report.failed_count, 0);

        let stale = h.store.get(stale);
        assert_eq!(stale.state, SessionState::Abandoned);
        assert_eq!(stale.clock_out, None);
        assert_eq!(stale.work_minutes, None);
        assert_eq!(h.store.get(fresh).state, SessionState::Open);
        assert_eq!(h.store.get(closed).state, SessionState::Closed);
    }

    #[actix_web::test]
    async fn grace_boundary_is_exclusive() {
        let h = Harness::new(thu_5am());
        let grace = SweepPolicy::default().grace;
        let on_edge = h.store.insert(open("a", thu_5am() - grace));
        let past_edge = h
            .store
            .insert(open("b", thu_5am() - grace - Duration::seconds(1)));

        let report = h.service().run_daily_sweep().await.unwrap();
        assert_eq!(report.processed_count, 1);
        assert_eq!(h.store.get(on_edge).state, SessionState::Open);
        assert_eq!(h.store.get(past_edge).state, SessionState::Abandoned);
    }

    #[actix_web::test]
    async fn second_run_is_a_no_op() {
        let h = Harness::new(thu_5am());
        for i in 0..5 {
            h.store.insert(open(&format!("s{i}"), at(wed(), 12 + i, 0)));
        }
        let service = h.service();

        assert_eq!(service.run_daily_sweep().await.unwrap().processed_count, 5);
        let snapshot = h.store.all();

        assert_eq!(service.run_daily_sweep().await.unwrap().processed_count, 0);
        assert_eq!(h.store.all(), snapshot);
    }

    #[actix_web::test]
    async fn walks_every_chunk() {
        let h = Harness::new(thu_5am());
        for i in 0..7 {
            h.store.insert(open(&format!("s{i}"), at(wed(), 9, i)));
        }
        let service = h.service_with(SweepPolicy {
            batch_size: 3,
            ..SweepPolicy::default()
        });

        let report = service.run_daily_sweep().await.unwrap();
        assert_eq!(report.processed_count, 7);
        assert!(h.store.all().iter().all(|r| r.state == SessionState::Abandoned));
    }

    #[actix_web::test]
    async fn failed_record_stays_open_for_next_run() {
        let h = Harness::new(thu_5am());
        let a = h.store.insert(open("a", at(wed(), 19, 0)));
        let b = h.store.insert(open("b", at(wed(), 20, 0)));
        let c = h.store.insert(open("c", at(wed(), 21, 0)));
        h.store.fail_mark(b);
        let service = h.service_with(SweepPolicy {
            batch_size: 2,
            ..SweepPolicy::default()
        });

        let report = service.run_daily_sweep().await.unwrap();
        assert_eq!(report.processed_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(h.store.get(a).state, SessionState::Abandoned);
        assert_eq!(h.store.get(b).state, SessionState::Open);
        assert_eq!(h.store.get(c).state, SessionState::Abandoned);

        h.store.heal_marks();
        let report = service.run_daily_sweep().await.unwrap();
        assert_eq!(report.processed_count, 1);
        assert_eq!(h.store.get(b).state, SessionState::Abandoned);
    }

    #[actix_web::test]
    async fn abandoned_session_can_no_longer_be_clocked_out_by_action() {
        let h = Harness::new(at(wed(), 22, 0));
        let service = h.service();
        let opened = service.clock_action("s1").await.unwrap();

        h.clock.set(thu_5am());
        service.run_daily_sweep().await.unwrap();

        h.clock.set(at(wed().succ_opt().unwrap(), 9, 0));
        let next = service.clock_action("s1").await.unwrap();
        assert_ne!(next.record.record_id, opened.record.record_id);
        assert_eq!(
            h.store.get(opened.record.record_id).state,
            SessionState::Abandoned
        );
    }

    #[test]
    fn sleep_duration_never_negative() {
        let now = at(wed(), 6, 0);
        assert_eq!(until(now, now - Duration::minutes(1)), std::time::Duration::ZERO);
        assert_eq!(
            until(now, at(wed(), 7, 0)),
            std::time::Duration::from_secs(3600)
        );
    }
}
