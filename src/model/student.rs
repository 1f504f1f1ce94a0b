use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Student {
    #[schema(example = "M1234567")]
    pub student_id: String,
    #[schema(example = "Lin Wei")]
    pub name: String,
    #[schema(example = 2, nullable = true)]
    pub team_id: Option<u32>,
    #[schema(example = 2)]
    pub role_id: u8,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_login_at: Option<NaiveDateTime>,
}
