use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{HomebaseId, RoleId, UserId};
use tembea_core::domain::role::{Role, RoleAssignment, UserRole};

use super::{column, RepositoryError};
use crate::DbPool;

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError>;
    async fn create(&self, name: &str) -> Result<Role, RepositoryError>;
    async fn list(&self) -> Result<Vec<Role>, RepositoryError>;
    async fn find_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        homebase_id: Option<HomebaseId>,
    ) -> Result<Option<UserRole>, RepositoryError>;
    async fn create_user_role(&self, user_role: UserRole) -> Result<UserRole, RepositoryError>;
    async fn roles_for_user(&self, user_id: UserId)
        -> Result<Vec<RoleAssignment>, RepositoryError>;
}

pub struct SqlRoleRepository {
    pool: DbPool,
}

impl SqlRoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_role(row: &SqliteRow) -> Result<Role, RepositoryError> {
    Ok(Role { id: RoleId(column(row, "id")?), name: column(row, "name")? })
}

#[async_trait]
impl RoleRepository for SqlRoleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE LOWER(name) = LOWER(?)")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_role).transpose()
    }

    async fn create(&self, name: &str) -> Result<Role, RepositoryError> {
        let name = name.trim();
        let result = sqlx::query("INSERT INTO roles (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(Role { id: RoleId(result.last_insert_rowid()), name: name.to_string() })
    }

    async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows =
            sqlx::query("SELECT id, name FROM roles ORDER BY id").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_role).collect()
    }

    async fn find_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        homebase_id: Option<HomebaseId>,
    ) -> Result<Option<UserRole>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, role_id, homebase_id FROM user_roles
             WHERE user_id = ? AND role_id = ? AND IFNULL(homebase_id, 0) = IFNULL(?, 0)",
        )
        .bind(user_id.0)
        .bind(role_id.0)
        .bind(homebase_id.map(|id| id.0))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok::<_, RepositoryError>(UserRole {
                user_id: UserId(column(&row, "user_id")?),
                role_id: RoleId(column(&row, "role_id")?),
                homebase_id: column::<Option<i64>>(&row, "homebase_id")?.map(HomebaseId),
            })
        })
        .transpose()
    }

    async fn create_user_role(&self, user_role: UserRole) -> Result<UserRole, RepositoryError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id, homebase_id) VALUES (?, ?, ?)")
            .bind(user_role.user_id.0)
            .bind(user_role.role_id.0)
            .bind(user_role.homebase_id.map(|id| id.0))
            .execute(&self.pool)
            .await?;
        Ok(user_role)
    }

    async fn roles_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT roles.id, roles.name, user_roles.homebase_id
             FROM user_roles
             JOIN roles ON roles.id = user_roles.role_id
             WHERE user_roles.user_id = ?
             ORDER BY roles.id",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok::<_, RepositoryError>(RoleAssignment {
                    role: row_to_role(row)?,
                    homebase_id: column::<Option<i64>>(row, "homebase_id")?.map(HomebaseId),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use tembea_core::domain::role::UserRole;

    use super::{RoleRepository, SqlRoleRepository};
    use crate::repositories::test_support::{setup, user};

    #[tokio::test]
    async fn role_names_are_unique() {
        let pool = setup().await;
        let repo = SqlRoleRepository::new(pool);

        repo.create("Super Admin").await.expect("create");
        let duplicate = repo.create("Super Admin").await.expect_err("duplicate");

        assert!(duplicate.is_unique_violation());
        assert!(repo.find_by_name("super admin").await.expect("lookup").is_some());
    }

    #[tokio::test]
    async fn user_role_without_homebase_is_found_and_unique() {
        let pool = setup().await;
        let admin = user(&pool, "UADMIN", "admin@andela.com").await;
        let repo = SqlRoleRepository::new(pool);
        let role = repo.create("Admin").await.expect("role");

        let assignment = UserRole { user_id: admin.id, role_id: role.id, homebase_id: None };
        repo.create_user_role(assignment.clone()).await.expect("assign");

        let found = repo.find_user_role(admin.id, role.id, None).await.expect("find");
        assert_eq!(found, Some(assignment.clone()));
        assert!(repo.create_user_role(assignment).await.expect_err("again").is_unique_violation());

        let roles = repo.roles_for_user(admin.id).await.expect("roles");
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role.name, "Admin");
    }
}
