use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{BatchUseRecordId, RouteBatchId, UserId};
use tembea_core::domain::usage::{AttendStatus, BatchUseRecord, NewBatchUseRecord, UsageEntry};

use super::{column, date_column, parse_column, RepositoryError, DATE_FORMAT};
use crate::DbPool;

const RECORD_COLUMNS: &str = "id, user_id, batch_id, user_attend_status, batch_date, reason";

/// Daily route batch attendance.
#[async_trait]
pub trait BatchUseRepository: Send + Sync {
    /// Records attendance for the day; an existing record for the same rider, batch and
    /// date is overwritten with `status`.
    async fn record(
        &self,
        record: NewBatchUseRecord,
        status: AttendStatus,
    ) -> Result<BatchUseRecord, RepositoryError>;
    async fn find_by_id(&self, id: BatchUseRecordId)
        -> Result<Option<BatchUseRecord>, RepositoryError>;
    async fn update_status(
        &self,
        id: BatchUseRecordId,
        status: AttendStatus,
        reason: Option<String>,
    ) -> Result<(), RepositoryError>;
    /// Attendance between `from` and `to` inclusive, joined with route and batch names.
    async fn usage_entries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<UsageEntry>, RepositoryError>;
}

pub struct SqlBatchUseRepository {
    pool: DbPool,
}

impl SqlBatchUseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &SqliteRow) -> Result<BatchUseRecord, RepositoryError> {
    Ok(BatchUseRecord {
        id: BatchUseRecordId(column(row, "id")?),
        user_id: UserId(column(row, "user_id")?),
        batch_id: RouteBatchId(column(row, "batch_id")?),
        user_attend_status: parse_column::<AttendStatus>(row, "user_attend_status")?,
        batch_date: date_column(row, "batch_date")?,
        reason: column(row, "reason")?,
    })
}

#[async_trait]
impl BatchUseRepository for SqlBatchUseRepository {
    async fn record(
        &self,
        record: NewBatchUseRecord,
        status: AttendStatus,
    ) -> Result<BatchUseRecord, RepositoryError> {
        let batch_date = record.batch_date.format(DATE_FORMAT).to_string();
        sqlx::query(
            "INSERT INTO batch_use_records (user_id, batch_id, user_attend_status, batch_date)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, batch_id, batch_date) DO UPDATE SET
                 user_attend_status = excluded.user_attend_status",
        )
        .bind(record.user_id.0)
        .bind(record.batch_id.0)
        .bind(status.as_str())
        .bind(&batch_date)
        .execute(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM batch_use_records
             WHERE user_id = ? AND batch_id = ? AND batch_date = ?"
        );
        let row = sqlx::query(&sql)
            .bind(record.user_id.0)
            .bind(record.batch_id.0)
            .bind(&batch_date)
            .fetch_one(&self.pool)
            .await?;
        row_to_record(&row)
    }

    async fn find_by_id(
        &self,
        id: BatchUseRecordId,
    ) -> Result<Option<BatchUseRecord>, RepositoryError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM batch_use_records WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn update_status(
        &self,
        id: BatchUseRecordId,
        status: AttendStatus,
        reason: Option<String>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE batch_use_records SET user_attend_status = ?, reason = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(reason)
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn usage_entries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<UsageEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT batch_use_records.batch_id, routes.name AS route,
                    route_batches.batch AS route_batch, batch_use_records.user_attend_status
             FROM batch_use_records
             JOIN route_batches ON route_batches.id = batch_use_records.batch_id
             JOIN routes ON routes.id = route_batches.route_id
             WHERE batch_use_records.batch_date BETWEEN ? AND ?
             ORDER BY batch_use_records.batch_id, batch_use_records.id",
        )
        .bind(from.format(DATE_FORMAT).to_string())
        .bind(to.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok::<_, RepositoryError>(UsageEntry {
                    batch_id: RouteBatchId(column(row, "batch_id")?),
                    route: column(row, "route")?,
                    route_batch: column(row, "route_batch")?,
                    user_attend_status: parse_column::<AttendStatus>(row, "user_attend_status")?,
                })
            })
            .collect()
    }
}
