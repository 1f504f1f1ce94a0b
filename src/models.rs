use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "M1234567")]
    pub student_id: String,
    #[schema(example = "Lin Wei")]
    pub name: String,
    #[schema(example = "s3cret")]
    pub password: String,
    #[schema(example = 2, nullable = true)]
    pub team_id: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "M1234567")]
    pub student_id: String,
    #[schema(example = "s3cret")]
    pub password: String,
}

#[derive(FromRow)]
pub struct StudentCredentials {
    pub student_id: String,
    pub name: String,
    pub password: String,
    pub role_id: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Student id.
    pub sub: String,
    pub name: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,
}
