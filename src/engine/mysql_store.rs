use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;

use super::error::StoreError;
use super::store::RecordStore;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, RecordId};

const RECORD_COLUMNS: &str =
    "record_id, student_id, work_date, clock_in, clock_out, work_minutes, state";

/// `RecordStore` over the `attendance_record` table.
///
/// The generated `open_guard` column carries a unique index, so a second
/// open session for a student fails the insert with SQLSTATE 23000.
#[derive(Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_of(
        &self,
        sql: &str,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(sql)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::try_from).transpose()?)
    }
}

fn into_records(rows: Vec<AttendanceRow>) -> Result<Vec<AttendanceRecord>, StoreError> {
    rows.into_iter()
        .map(|row| AttendanceRecord::try_from(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn create_open_session(
        &self,
        student_id: &str,
        work_date: NaiveDate,
        clock_in: NaiveDateTime,
    ) -> Result<RecordId, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_record (student_id, work_date, clock_in, state)
            VALUES (?, ?, ?, 'open')
            "#,
        )
        .bind(student_id)
        .bind(work_date)
        .bind(clock_in)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn find_open_session(
        &self,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_record
            WHERE student_id = ? AND state = 'open'
            ORDER BY work_date DESC, clock_in DESC
            LIMIT 1
            "#
        );
        self.fetch_one_of(&sql, student_id).await
    }

    async fn close_session(
        &self,
        record_id: RecordId,
        clock_out: NaiveDateTime,
        work_minutes: i64,
        overtime_minutes: i64,
    ) -> Result<bool, StoreError> {
        // overtime_minutes is a cache; reads recompute it
        let result = sqlx::query(
            r#"
            UPDATE attendance_record
            SET clock_out = ?, work_minutes = ?, overtime_minutes = ?, state = 'closed'
            WHERE record_id = ? AND state <> 'closed'
            "#,
        )
        .bind(clock_out)
        .bind(work_minutes)
        .bind(overtime_minutes)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_abandoned(&self, record_id: RecordId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_record
            SET state = 'abandoned'
            WHERE record_id = ? AND state = 'open'
            "#,
        )
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_record(
        &self,
        record_id: RecordId,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_record WHERE record_id = ? AND student_id = ?"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(record_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::try_from).transpose()?)
    }

    async fn scan_open_older_than(
        &self,
        cutoff: NaiveDateTime,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_record
            WHERE state = 'open' AND clock_in < ? AND record_id > ?
            ORDER BY record_id
            LIMIT ?
            "#
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(cutoff)
            .bind(after.unwrap_or(0))
            .bind(limit as u64)
            .fetch_all(&self.pool)
            .await?;
        into_records(rows)
    }

    async fn latest_record(
        &self,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_record
            WHERE student_id = ?
            ORDER BY work_date DESC, clock_in DESC
            LIMIT 1
            "#
        );
        self.fetch_one_of(&sql, student_id).await
    }

    async fn find_abandoned(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_record
            WHERE student_id = ? AND state = 'abandoned'
            ORDER BY work_date DESC, clock_in DESC
            "#
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        into_records(rows)
    }

    async fn list_records(
        &self,
        student_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM attendance_record WHERE student_id = ?");
        if from.is_some() {
            sql.push_str(" AND work_date >= ?");
        }
        if to.is_some() {
            sql.push_str(" AND work_date <= ?");
        }
        sql.push_str(" ORDER BY work_date DESC, clock_in DESC");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql).bind(student_id);
        if let Some(from) = from {
            query = query.bind(from);
        }
        if let Some(to) = to {
            query = query.bind(to);
        }

        let rows = query.fetch_all(&self.pool).await?;
        into_records(rows)
    }
}
