use crate::api::attendance::{
    ClockResponse, RecordView, RecordsQuery, RecordsResponse, RetroCloseReq, StatusResponse,
};
use crate::api::reward::{AchievementView, CatalogEntry, CheckResponse, EarnedView};
use crate::engine::session::ClockActionKind;
use crate::engine::sweeper::SweepReport;
use crate::model::attendance::SessionState;
use crate::model::student::Student;
use crate::models::{LoginReqDto, RegisterReq};
use crate::reward::Level;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lab Attendance API",
        version = "1.0.0",
        description = r#"
## Student attendance and overtime tracking

Single-button clock in / clock out for lab members, with overtime measured
against the standard 10:00-20:00 window (weekends count in full).

### Key Features
- **Attendance**
  - One endpoint toggles between clock-in and clock-out
  - Sessions may run past midnight; they stay attributed to the clock-in date
  - Sessions left open are swept at the daily reset and can be closed
    retroactively with a clock-out between 20:00 and 05:00
- **Achievements**
  - Granted automatically after every clock-out

### Time format
All timestamps are RFC 3339 instants with offset, rendered in the
organization's timezone.

### Security
Endpoints under `/api` require a **JWT Bearer** token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::profile,

        crate::api::attendance::clock,
        crate::api::attendance::today,
        crate::api::attendance::records,
        crate::api::attendance::retroactive_close,

        crate::api::reward::all_rewards,
        crate::api::reward::my_rewards,
        crate::api::reward::check_rewards,

        crate::api::admin::run_sweep
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            Student,
            SessionState,
            ClockActionKind,
            RecordView,
            ClockResponse,
            StatusResponse,
            RecordsQuery,
            RecordsResponse,
            RetroCloseReq,
            Level,
            AchievementView,
            CatalogEntry,
            EarnedView,
            CheckResponse,
            SweepReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Attendance", description = "Clock actions and history"),
        (name = "Reward", description = "Achievements"),
        (name = "Admin", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
