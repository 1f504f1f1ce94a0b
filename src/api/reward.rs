use std::collections::HashMap;

use crate::auth::auth::AuthUser;
use crate::engine::error::AttendanceError;
use crate::engine::store::AchievementCheck;
use crate::reward::store::{EarnedReward, MySqlAchievements};
use crate::reward::{Achievement, CATALOG, Level, catalog};
use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct AchievementView {
    #[schema(example = 1)]
    pub reward_id: u32,
    #[schema(example = "First Steps")]
    pub title: String,
    #[schema(example = "Log one hour of overtime")]
    pub description: String,
    pub level: Level,
}

impl AchievementView {
    pub fn by_id(id: u32) -> Option<Self> {
        catalog::find(id).map(Self::from)
    }
}

impl From<&Achievement> for AchievementView {
    fn from(a: &Achievement) -> Self {
        Self {
            reward_id: a.id,
            title: a.title.to_string(),
            description: a.description.to_string(),
            level: a.level,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub achievement: AchievementView,
    /// Students holding this achievement
    #[schema(example = 12)]
    pub earned_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EarnedView {
    #[serde(flatten)]
    pub achievement: AchievementView,
    #[schema(value_type = String, format = "date-time")]
    pub earned_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub new_rewards: Vec<AchievementView>,
}

/// Every achievement with the number of students holding it
#[utoipa::path(
    get,
    path = "/api/reward/all",
    responses(
        (status = 200, description = "Achievement catalog", body = [CatalogEntry]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Reward"
)]
pub async fn all_rewards(
    _auth: AuthUser,
    rewards: web::Data<MySqlAchievements>,
) -> Result<HttpResponse, AttendanceError> {
    let counts: HashMap<u32, i64> = rewards.earner_counts().await?.into_iter().collect();

    let entries: Vec<CatalogEntry> = CATALOG
        .iter()
        .map(|a| CatalogEntry {
            achievement: a.into(),
            earned_count: counts.get(&a.id).copied().unwrap_or(0),
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

/// Achievements held by the caller
#[utoipa::path(
    get,
    path = "/api/reward/my",
    responses(
        (status = 200, description = "Earned achievements, newest first", body = [EarnedView]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Reward"
)]
pub async fn my_rewards(
    auth: AuthUser,
    rewards: web::Data<MySqlAchievements>,
) -> Result<HttpResponse, AttendanceError> {
    let earned: Vec<EarnedView> = rewards
        .earned_by(&auth.student_id)
        .await?
        .into_iter()
        .filter_map(|EarnedReward { reward_id, earned_at }| {
            AchievementView::by_id(reward_id).map(|achievement| EarnedView {
                achievement,
                earned_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(earned))
}

/// Re-evaluate the caller's achievements
#[utoipa::path(
    post,
    path = "/api/reward/check",
    responses(
        (status = 200, description = "Newly granted achievements", body = CheckResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Reward"
)]
pub async fn check_rewards(
    auth: AuthUser,
    rewards: web::Data<MySqlAchievements>,
) -> Result<HttpResponse, AttendanceError> {
    let granted = rewards.check_and_grant(&auth.student_id).await?;

    Ok(HttpResponse::Ok().json(CheckResponse {
        new_rewards: granted
            .into_iter()
            .filter_map(AchievementView::by_id)
            .collect(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reward")
            .service(web::resource("/all").route(web::get().to(all_rewards)))
            .service(web::resource("/my").route(web::get().to(my_rewards)))
            .service(web::resource("/check").route(web::post().to(check_rewards))),
    );
}
