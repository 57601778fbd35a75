use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::department::{Department, NewDepartment};
use tembea_core::domain::ids::{DepartmentId, HomebaseId, UserId};
use tembea_core::domain::page::PageRequest;
use tembea_core::domain::EntityStatus;

use super::{column, parse_column, RepositoryError};
use crate::DbPool;

const DEPARTMENT_COLUMNS: &str = "id, name, head_id, homebase_id, status";

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find_by_id(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError>;
    /// Case-insensitive match on the start of the name, active or not.
    async fn find_by_name_prefix(&self, name: &str)
        -> Result<Option<Department>, RepositoryError>;
    async fn create(&self, department: NewDepartment) -> Result<Department, RepositoryError>;
    async fn update(&self, department: &Department) -> Result<(), RepositoryError>;
    /// Active departments, newest first, with the total active count.
    async fn list_active(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<Department>, u64), RepositoryError>;
}

pub struct SqlDepartmentRepository {
    pool: DbPool,
}

impl SqlDepartmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_department(row: &SqliteRow) -> Result<Department, RepositoryError> {
    Ok(Department {
        id: DepartmentId(column(row, "id")?),
        name: column(row, "name")?,
        head_id: column::<Option<i64>>(row, "head_id")?.map(UserId),
        homebase_id: column::<Option<i64>>(row, "homebase_id")?.map(HomebaseId),
        status: parse_column::<EntityStatus>(row, "status")?,
    })
}

#[async_trait]
impl DepartmentRepository for SqlDepartmentRepository {
    async fn find_by_id(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_department).transpose()
    }

    async fn find_by_name_prefix(
        &self,
        name: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        let sql = format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments
             WHERE LOWER(name) LIKE LOWER(?) || '%'
             ORDER BY LENGTH(name), id
             LIMIT 1"
        );
        let row = sqlx::query(&sql).bind(name.trim()).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_department).transpose()
    }

    async fn create(&self, department: NewDepartment) -> Result<Department, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO departments (name, head_id, homebase_id, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&department.name)
        .bind(department.head_id.0)
        .bind(department.homebase_id.map(|id| id.0))
        .bind(EntityStatus::Active.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Department {
            id: DepartmentId(result.last_insert_rowid()),
            name: department.name,
            head_id: Some(department.head_id),
            homebase_id: department.homebase_id,
            status: EntityStatus::Active,
        })
    }

    async fn update(&self, department: &Department) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE departments SET name = ?, head_id = ?, homebase_id = ?, status = ?
             WHERE id = ?",
        )
        .bind(&department.name)
        .bind(department.head_id.map(|id| id.0))
        .bind(department.homebase_id.map(|id| id.0))
        .bind(department.status.as_str())
        .bind(department.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_active(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<Department>, u64), RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM departments WHERE status = 'Active'")
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments
             WHERE status = 'Active'
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.size))
            .bind(i64::from(page.offset()))
            .fetch_all(&self.pool)
            .await?;

        let departments = rows.iter().map(row_to_department).collect::<Result<Vec<_>, _>>()?;
        Ok((departments, u64::try_from(total).unwrap_or_default()))
    }
}
