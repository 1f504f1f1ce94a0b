use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDateTime;
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

use crate::model::attendance::RecordId;

/// Failures reported by the record store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflicting write")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// MySQL `ER_DUP_ENTRY`. Other integrity errors share SQLSTATE 23000.
const ER_DUP_ENTRY: u16 = 1062;

impl StoreError {
    fn from_mysql_number(number: Option<u16>, detail: String) -> Self {
        match number {
            Some(ER_DUP_ENTRY) => StoreError::Conflict,
            _ => StoreError::Unavailable(detail),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let number = match &err {
            sqlx::Error::Database(db_err) => db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number),
            _ => None,
        };
        StoreError::from_mysql_number(number, err.to_string())
    }
}

impl From<strum::ParseError> for StoreError {
    fn from(err: strum::ParseError) -> Self {
        StoreError::Unavailable(format!("corrupt state column: {err}"))
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("student {student_id} already has an open session")]
    Conflict { student_id: String },

    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("record {0} is already closed")]
    AlreadyClosed(RecordId),

    #[error("clock-out {clock_out} must be after clock-in {clock_in}")]
    InvalidOrder {
        clock_in: NaiveDateTime,
        clock_out: NaiveDateTime,
    },

    #[error("clock-out {clock_out} must be between {from} and {until} (exclusive)")]
    OutOfWindow {
        clock_out: NaiveDateTime,
        from: NaiveDateTime,
        until: NaiveDateTime,
    },

    #[error("clock-out {clock_out} is later than the current time {now}")]
    InFuture {
        clock_out: NaiveDateTime,
        now: NaiveDateTime,
    },

    #[error(transparent)]
    StoreUnavailable(StoreError),
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        AttendanceError::StoreUnavailable(err)
    }
}

impl AttendanceError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::Conflict { .. } => "conflict",
            AttendanceError::NotFound(_) => "not_found",
            AttendanceError::AlreadyClosed(_) => "already_closed",
            AttendanceError::InvalidOrder { .. } => "invalid_order",
            AttendanceError::OutOfWindow { .. } => "out_of_window",
            AttendanceError::InFuture { .. } => "clock_out_in_future",
            AttendanceError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Conflict { .. } | AttendanceError::AlreadyClosed(_) => {
                StatusCode::CONFLICT
            }
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::InvalidOrder { .. }
            | AttendanceError::OutOfWindow { .. }
            | AttendanceError::InFuture { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // store details stay in the logs
        let message = match self {
            AttendanceError::StoreUnavailable(_) => "Attendance store unavailable".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": message,
        }))
    }
}
