use crate::api::reward::AchievementView;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::error::AttendanceError;
use crate::engine::overtime::compute_overtime_minutes;
use crate::engine::session::{AttendanceService, ClockActionKind, ClockOutcome, ClosedSession};
use crate::engine::time_window::{is_overnight, is_weekend, to_instant, to_local};
use crate::model::attendance::{AttendanceRecord, SessionState};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, FixedOffset, NaiveDate, SubsecRound};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordView {
    #[schema(example = 42)]
    pub record_id: u64,
    #[schema(example = "M1234567")]
    pub student_id: String,
    #[schema(example = "2025-01-08", value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(example = "2025-01-08T09:00:00+08:00", value_type = String, format = "date-time")]
    pub clock_in: DateTime<FixedOffset>,
    #[schema(example = "2025-01-08T21:30:00+08:00", value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<DateTime<FixedOffset>>,
    pub state: SessionState,
    #[schema(example = 750)]
    pub work_minutes: Option<i64>,
    /// Recomputed from the timestamps on every read.
    #[schema(example = 150)]
    pub overtime_minutes: Option<i64>,
    pub is_weekend: bool,
    pub is_overnight: bool,
}

impl RecordView {
    pub fn new(record: &AttendanceRecord, tz: FixedOffset) -> Self {
        let closed_at = record.clock_out.filter(|_| record.is_closed());
        Self {
            record_id: record.record_id,
            student_id: record.student_id.clone(),
            work_date: record.work_date,
            clock_in: to_instant(record.clock_in, tz),
            clock_out: record.clock_out.map(|out| to_instant(out, tz)),
            state: record.state,
            work_minutes: record.work_minutes,
            overtime_minutes: closed_at
                .map(|out| compute_overtime_minutes(record.clock_in, out, record.work_date)),
            is_weekend: is_weekend(record.work_date),
            is_overnight: closed_at.is_some_and(|out| is_overnight(record.work_date, out)),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClockResponse {
    #[schema(example = "Clocked out")]
    pub message: String,
    pub action: ClockActionKind,
    pub record: RecordView,
    pub work_minutes: Option<i64>,
    pub overtime_minutes: Option<i64>,
    /// Absent when the achievement check could not run.
    pub new_achievements: Option<Vec<AchievementView>>,
}

impl ClockResponse {
    fn new(outcome: ClockOutcome, tz: FixedOffset) -> Self {
        let message = match outcome.action {
            ClockActionKind::ClockIn => "Clocked in",
            ClockActionKind::ClockOut => "Clocked out",
        };
        Self {
            message: message.to_string(),
            action: outcome.action,
            record: RecordView::new(&outcome.record, tz),
            work_minutes: outcome.minutes.map(|m| m.work),
            overtime_minutes: outcome.minutes.map(|m| m.overtime),
            new_achievements: outcome
                .new_achievements
                .map(|ids| ids.into_iter().filter_map(AchievementView::by_id).collect()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// True while a session is open; the next clock action is a clock-out.
    pub clocked_in: bool,
    pub record: Option<RecordView>,
    /// Sessions closed by the daily reset that still need a clock-out.
    pub pending_close: Vec<RecordView>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RecordsQuery {
    /// First work date, inclusive
    #[schema(example = "2025-01-01", value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    /// Last work date, inclusive
    #[schema(example = "2025-01-31", value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordsResponse {
    pub total: usize,
    pub records: Vec<RecordView>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RetroCloseReq {
    /// Clock-out instant with offset, between 20:00 of the work date and 05:00 the next day
    #[schema(example = "2025-01-09T01:30:00+08:00", value_type = String, format = "date-time")]
    pub clock_out: DateTime<FixedOffset>,
}

/// Single-button clock in / clock out
#[utoipa::path(
    post,
    path = "/api/attendance/clock",
    responses(
        (status = 200, description = "Clocked in or out", body = ClockResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent clock actions kept conflicting"),
        (status = 422, description = "Clock-out not after clock-in"),
        (status = 503, description = "Attendance store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let outcome = service.clock_action(&auth.student_id).await?;
    Ok(HttpResponse::Ok().json(ClockResponse::new(outcome, config.org_offset)))
}

/// Current session status
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Open session or latest record", body = StatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Attendance store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let status = service.get_open_or_latest(&auth.student_id).await?;
    let tz = config.org_offset;

    Ok(HttpResponse::Ok().json(StatusResponse {
        clocked_in: status.clocked_in,
        record: status.record.as_ref().map(|r| RecordView::new(r, tz)),
        pending_close: status
            .abandoned
            .iter()
            .map(|r| RecordView::new(r, tz))
            .collect(),
    }))
}

/// Attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/records",
    params(RecordsQuery),
    responses(
        (status = 200, description = "Records, newest first", body = RecordsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Attendance store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn records(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
    query: web::Query<RecordsQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let records = service
        .list_records(&auth.student_id, query.start_date, query.end_date)
        .await?;
    let records: Vec<RecordView> = records
        .iter()
        .map(|r| RecordView::new(r, config.org_offset))
        .collect();

    Ok(HttpResponse::Ok().json(RecordsResponse {
        total: records.len(),
        records,
    }))
}

/// Supply a forgotten clock-out
#[utoipa::path(
    post,
    path = "/api/attendance/records/{record_id}/close",
    params(
        ("record_id" = u64, Path, description = "Open or abandoned record to close")
    ),
    request_body = RetroCloseReq,
    responses(
        (status = 200, description = "Record closed", body = ClockResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Record not found", body = Object, example = json!({
            "error": "not_found", "message": "record 42 not found"
        })),
        (status = 409, description = "Record already closed", body = Object, example = json!({
            "error": "already_closed", "message": "record 42 is already closed"
        })),
        (status = 422, description = "Clock-out before clock-in, outside 20:00-05:00, or later than now", body = Object, example = json!({
            "error": "out_of_window",
            "message": "clock-out 2025-01-08 19:00:00 must be between 2025-01-08 20:00:00 and 2025-01-09 05:00:00 (exclusive)"
        })),
        (status = 503, description = "Attendance store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn retroactive_close(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<RetroCloseReq>,
) -> Result<HttpResponse, AttendanceError> {
    let record_id = path.into_inner();
    // stored with whole-second precision
    let clock_out = to_local(payload.clock_out, config.org_offset).trunc_subsecs(0);

    let closed: ClosedSession = service
        .retroactive_close(record_id, &auth.student_id, clock_out)
        .await?;

    Ok(HttpResponse::Ok().json(ClockResponse::new(closed.into(), config.org_offset)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .service(web::resource("/clock").route(web::post().to(clock)))
            .service(web::resource("/today").route(web::get().to(today)))
            .service(web::resource("/records").route(web::get().to(records)))
            .service(
                web::resource("/records/{record_id}/close")
                    .route(web::post().to(retroactive_close)),
            ),
    );
}
