use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{HomebaseId, RouteBatchId, UserId};
use tembea_core::domain::user::{NewUser, User};

use super::{column, RepositoryError};
use crate::DbPool;

const USER_COLUMNS: &str =
    "id, name, slack_id, email, phone_no, default_homebase_id, route_batch_id";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_slack_id(&self, slack_id: &str) -> Result<Option<User>, RepositoryError>;
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;
    async fn list_by_route_batch(
        &self,
        batch_id: RouteBatchId,
    ) -> Result<Vec<User>, RepositoryError>;
    /// Detaches every rider from the batch and returns how many were detached.
    async fn clear_route_batch(&self, batch_id: RouteBatchId) -> Result<u64, RepositoryError>;
}

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
        let row = sqlx::query(&sql).bind(value).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_user).transpose()
    }
}

pub(crate) fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(column(row, "id")?),
        name: column(row, "name")?,
        slack_id: column(row, "slack_id")?,
        email: column(row, "email")?,
        phone_no: column(row, "phone_no")?,
        default_homebase_id: column::<Option<i64>>(row, "default_homebase_id")?.map(HomebaseId),
        route_batch_id: column::<Option<i64>>(row, "route_batch_id")?.map(RouteBatchId),
    })
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("LOWER(email) = LOWER(?)", email.trim()).await
    }

    async fn find_by_slack_id(&self, slack_id: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("slack_id = ?", slack_id.trim()).await
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (name, slack_id, email, phone_no) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.slack_id)
        .bind(&user.email)
        .bind(&user.phone_no)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: UserId(result.last_insert_rowid()),
            name: user.name,
            slack_id: user.slack_id,
            email: user.email,
            phone_no: user.phone_no,
            default_homebase_id: None,
            route_batch_id: None,
        })
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users
             SET name = ?, slack_id = ?, email = ?, phone_no = ?,
                 default_homebase_id = ?, route_batch_id = ?
             WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.slack_id)
        .bind(&user.email)
        .bind(&user.phone_no)
        .bind(user.default_homebase_id.map(|id| id.0))
        .bind(user.route_batch_id.map(|id| id.0))
        .bind(user.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_route_batch(
        &self,
        batch_id: RouteBatchId,
    ) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE route_batch_id = ? ORDER BY id");
        let rows = sqlx::query(&sql).bind(batch_id.0).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn clear_route_batch(&self, batch_id: RouteBatchId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE users SET route_batch_id = NULL WHERE route_batch_id = ?")
            .bind(batch_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use tembea_core::domain::user::NewUser;

    use super::{SqlUserRepository, UserRepository};
    use crate::repositories::test_support::setup;

    fn new_user(slack_id: &str, email: &str) -> NewUser {
        NewUser {
            name: "Tembea Devs".to_string(),
            slack_id: slack_id.to_string(),
            email: email.to_string(),
            phone_no: Some("+254700000000".to_string()),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_each_key() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let created =
            repo.create(new_user("U123", "tembea.devs@andela.com")).await.expect("create");

        let by_id = repo.find_by_id(created.id).await.expect("by id").expect("present");
        let by_email =
            repo.find_by_email("Tembea.Devs@andela.com").await.expect("by email").expect("present");
        let by_slack = repo.find_by_slack_id("U123").await.expect("by slack").expect("present");

        assert_eq!(by_id, created);
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_slack.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_slack_id_is_a_unique_violation() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);
        repo.create(new_user("U1", "one@andela.com")).await.expect("first");

        let error = repo.create(new_user("U1", "two@andela.com")).await.expect_err("duplicate");
        assert!(error.is_unique_violation());
    }

    #[tokio::test]
    async fn update_persists_merged_fields() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);
        let mut user = repo.create(new_user("U9", "nine@andela.com")).await.expect("create");

        user.name = "Nine Nine".to_string();
        user.phone_no = None;
        repo.update(&user).await.expect("update");

        let stored = repo.find_by_id(user.id).await.expect("find").expect("present");
        assert_eq!(stored.name, "Nine Nine");
        assert_eq!(stored.phone_no, None);
    }
}
