use crate::auth::auth::AuthUser;
use crate::engine::session::AttendanceService;
use crate::engine::sweeper::SweepReport;
use actix_web::{HttpResponse, web};
use tracing::info;

/// Run the daily reset now
#[utoipa::path(
    post,
    path = "/api/admin/sweep",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 503, description = "Attendance store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn run_sweep(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    info!(admin = %auth.student_id, "Manual sweep requested");
    let report = service.run_daily_sweep().await?;

    Ok(HttpResponse::Ok().json(report))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").service(web::resource("/sweep").route(web::post().to(run_sweep))),
    );
}
