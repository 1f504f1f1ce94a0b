use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use super::catalog::newly_earned;
use crate::engine::error::StoreError;
use crate::engine::store::AchievementCheck;
use crate::model::attendance::{AttendanceRecord, AttendanceRow};

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct EarnedReward {
    #[schema(example = 2)]
    pub reward_id: u32,
    #[schema(value_type = String, format = "date-time")]
    pub earned_at: NaiveDateTime,
}

/// Achievement checker and queries over `student_reward`.
#[derive(Clone)]
pub struct MySqlAchievements {
    pool: MySqlPool,
}

impl MySqlAchievements {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn earned_by(&self, student_id: &str) -> Result<Vec<EarnedReward>, StoreError> {
        let rows = sqlx::query_as::<_, EarnedReward>(
            r#"
            SELECT reward_id, earned_at
            FROM student_reward
            WHERE student_id = ?
            ORDER BY earned_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of students holding each reward.
    pub async fn earner_counts(&self) -> Result<Vec<(u32, i64)>, StoreError> {
        let rows = sqlx::query_as::<_, (u32, i64)>(
            "SELECT reward_id, COUNT(*) FROM student_reward GROUP BY reward_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn history(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT record_id, student_id, work_date, clock_in, clock_out, work_minutes, state
            FROM attendance_record
            WHERE student_id = ?
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| AttendanceRecord::try_from(row).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl AchievementCheck for MySqlAchievements {
    async fn check_and_grant(&self, student_id: &str) -> Result<Vec<u32>, StoreError> {
        let records = self.history(student_id).await?;
        let earned: HashSet<u32> = self
            .earned_by(student_id)
            .await?
            .into_iter()
            .map(|e| e.reward_id)
            .collect();

        let fresh = newly_earned(&records, &earned);
        let mut granted = Vec::with_capacity(fresh.len());

        for reward_id in fresh {
            let result = sqlx::query(
                r#"
                INSERT IGNORE INTO student_reward (student_id, reward_id, earned_at)
                VALUES (?, ?, NOW())
                "#,
            )
            .bind(student_id)
            .bind(reward_id)
            .execute(&self.pool)
            .await?;

            // a concurrent check may have granted it first
            if result.rows_affected() == 1 {
                granted.push(reward_id);
            }
        }

        if !granted.is_empty() {
            info!(student_id, ?granted, "Achievements granted");
        }
        Ok(granted)
    }
}
