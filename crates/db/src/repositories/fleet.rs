use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::fleet::{Cab, Driver, NewCab, NewDriver, NewProvider, Provider};
use tembea_core::domain::ids::{CabId, DriverId, ProviderId, UserId};
use tembea_core::domain::page::PageRequest;

use super::{column, u32_column, RepositoryError};
use crate::DbPool;

const PROVIDER_COLUMNS: &str = "providers.id, providers.name, providers.provider_user_id, \
                                providers.is_direct_message, providers.channel_id";
const DRIVER_COLUMNS: &str =
    "id, driver_name, driver_phone_no, driver_number, email, provider_id, user_id";
const CAB_COLUMNS: &str = "id, reg_number, model, capacity, provider_id";

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn create(&self, provider: NewProvider) -> Result<Provider, RepositoryError>;
    async fn find_by_id(&self, id: ProviderId) -> Result<Option<Provider>, RepositoryError>;
    /// The provider whose owning user has this Slack id.
    async fn find_by_user_slack_id(
        &self,
        slack_id: &str,
    ) -> Result<Option<Provider>, RepositoryError>;
    async fn list(&self, page: PageRequest) -> Result<(Vec<Provider>, u64), RepositoryError>;
}

#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn create(&self, driver: NewDriver) -> Result<Driver, RepositoryError>;
    async fn find_by_id(&self, id: DriverId) -> Result<Option<Driver>, RepositoryError>;
    async fn find_by_number(&self, driver_number: &str)
        -> Result<Option<Driver>, RepositoryError>;
    async fn list(
        &self,
        provider_id: Option<ProviderId>,
        page: PageRequest,
    ) -> Result<(Vec<Driver>, u64), RepositoryError>;
    async fn update(&self, driver: &Driver) -> Result<(), RepositoryError>;
    async fn delete(&self, id: DriverId) -> Result<bool, RepositoryError>;
    /// True when another driver already uses the email, phone number or driver number.
    async fn exists(
        &self,
        email: Option<&str>,
        phone_no: Option<&str>,
        driver_number: Option<&str>,
        exclude: Option<DriverId>,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CabRepository: Send + Sync {
    async fn create(&self, cab: NewCab) -> Result<Cab, RepositoryError>;
    async fn find_by_id(&self, id: CabId) -> Result<Option<Cab>, RepositoryError>;
    async fn find_by_reg_number(&self, reg_number: &str) -> Result<Option<Cab>, RepositoryError>;
    async fn delete(&self, id: CabId) -> Result<bool, RepositoryError>;
    async fn list(
        &self,
        provider_id: Option<ProviderId>,
        page: PageRequest,
    ) -> Result<(Vec<Cab>, u64), RepositoryError>;
}

pub struct SqlProviderRepository {
    pool: DbPool,
}

impl SqlProviderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub struct SqlDriverRepository {
    pool: DbPool,
}

impl SqlDriverRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub struct SqlCabRepository {
    pool: DbPool,
}

impl SqlCabRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_provider(row: &SqliteRow) -> Result<Provider, RepositoryError> {
    Ok(Provider {
        id: ProviderId(column(row, "id")?),
        name: column(row, "name")?,
        provider_user_id: UserId(column(row, "provider_user_id")?),
        is_direct_message: column(row, "is_direct_message")?,
        channel_id: column(row, "channel_id")?,
    })
}

fn row_to_driver(row: &SqliteRow) -> Result<Driver, RepositoryError> {
    Ok(Driver {
        id: DriverId(column(row, "id")?),
        driver_name: column(row, "driver_name")?,
        driver_phone_no: column(row, "driver_phone_no")?,
        driver_number: column(row, "driver_number")?,
        email: column(row, "email")?,
        provider_id: ProviderId(column(row, "provider_id")?),
        user_id: column::<Option<i64>>(row, "user_id")?.map(UserId),
    })
}

fn row_to_cab(row: &SqliteRow) -> Result<Cab, RepositoryError> {
    Ok(Cab {
        id: CabId(column(row, "id")?),
        reg_number: column(row, "reg_number")?,
        model: column(row, "model")?,
        capacity: u32_column(row, "capacity")?,
        provider_id: ProviderId(column(row, "provider_id")?),
    })
}

fn total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

#[async_trait]
impl ProviderRepository for SqlProviderRepository {
    async fn create(&self, provider: NewProvider) -> Result<Provider, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO providers
                 (name, provider_user_id, is_direct_message, channel_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&provider.name)
        .bind(provider.provider_user_id.0)
        .bind(provider.is_direct_message)
        .bind(&provider.channel_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Provider {
            id: ProviderId(result.last_insert_rowid()),
            name: provider.name,
            provider_user_id: provider.provider_user_id,
            is_direct_message: provider.is_direct_message,
            channel_id: provider.channel_id,
        })
    }

    async fn find_by_id(&self, id: ProviderId) -> Result<Option<Provider>, RepositoryError> {
        let sql = format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE providers.id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_provider).transpose()
    }

    async fn find_by_user_slack_id(
        &self,
        slack_id: &str,
    ) -> Result<Option<Provider>, RepositoryError> {
        let sql = format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers
             JOIN users ON users.id = providers.provider_user_id
             WHERE users.slack_id = ?
             LIMIT 1"
        );
        let row = sqlx::query(&sql).bind(slack_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_provider).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<Provider>, u64), RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM providers").fetch_one(&self.pool).await?;
        let sql = format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers ORDER BY providers.name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.size))
            .bind(i64::from(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let providers = rows.iter().map(row_to_provider).collect::<Result<Vec<_>, _>>()?;
        Ok((providers, total(count)))
    }
}

#[async_trait]
impl DriverRepository for SqlDriverRepository {
    async fn create(&self, driver: NewDriver) -> Result<Driver, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO drivers
                 (driver_name, driver_phone_no, driver_number, email, provider_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&driver.driver_name)
        .bind(&driver.driver_phone_no)
        .bind(&driver.driver_number)
        .bind(&driver.email)
        .bind(driver.provider_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Driver {
            id: DriverId(result.last_insert_rowid()),
            driver_name: driver.driver_name,
            driver_phone_no: driver.driver_phone_no,
            driver_number: driver.driver_number,
            email: driver.email,
            provider_id: driver.provider_id,
            user_id: None,
        })
    }

    async fn find_by_id(&self, id: DriverId) -> Result<Option<Driver>, RepositoryError> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_driver).transpose()
    }

    async fn find_by_number(
        &self,
        driver_number: &str,
    ) -> Result<Option<Driver>, RepositoryError> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE driver_number = ?");
        let row = sqlx::query(&sql).bind(driver_number.trim()).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_driver).transpose()
    }

    async fn list(
        &self,
        provider_id: Option<ProviderId>,
        page: PageRequest,
    ) -> Result<(Vec<Driver>, u64), RepositoryError> {
        let provider = provider_id.map(|id| id.0);
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM drivers WHERE ? IS NULL OR provider_id = ?")
                .bind(provider)
                .bind(provider)
                .fetch_one(&self.pool)
                .await?;
        let sql = format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers
             WHERE ? IS NULL OR provider_id = ?
             ORDER BY driver_name, id
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(provider)
            .bind(provider)
            .bind(i64::from(page.size))
            .bind(i64::from(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let drivers = rows.iter().map(row_to_driver).collect::<Result<Vec<_>, _>>()?;
        Ok((drivers, total(count)))
    }

    async fn update(&self, driver: &Driver) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE drivers
             SET driver_name = ?, driver_phone_no = ?, driver_number = ?, email = ?,
                 provider_id = ?, user_id = ?
             WHERE id = ?",
        )
        .bind(&driver.driver_name)
        .bind(&driver.driver_phone_no)
        .bind(&driver.driver_number)
        .bind(&driver.email)
        .bind(driver.provider_id.0)
        .bind(driver.user_id.map(|id| id.0))
        .bind(driver.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: DriverId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM drivers WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists(
        &self,
        email: Option<&str>,
        phone_no: Option<&str>,
        driver_number: Option<&str>,
        exclude: Option<DriverId>,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM drivers
             WHERE (email = ? OR driver_phone_no = ? OR driver_number = ?)
               AND (? IS NULL OR id <> ?)",
        )
        .bind(email)
        .bind(phone_no)
        .bind(driver_number)
        .bind(exclude.map(|id| id.0))
        .bind(exclude.map(|id| id.0))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl CabRepository for SqlCabRepository {
    async fn create(&self, cab: NewCab) -> Result<Cab, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO cabs (reg_number, model, capacity, provider_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&cab.reg_number)
        .bind(&cab.model)
        .bind(i64::from(cab.capacity))
        .bind(cab.provider_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Cab {
            id: CabId(result.last_insert_rowid()),
            reg_number: cab.reg_number,
            model: cab.model,
            capacity: cab.capacity,
            provider_id: cab.provider_id,
        })
    }

    async fn find_by_id(&self, id: CabId) -> Result<Option<Cab>, RepositoryError> {
        let sql = format!("SELECT {CAB_COLUMNS} FROM cabs WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_cab).transpose()
    }

    async fn find_by_reg_number(&self, reg_number: &str) -> Result<Option<Cab>, RepositoryError> {
        let sql = format!("SELECT {CAB_COLUMNS} FROM cabs WHERE UPPER(reg_number) = UPPER(?)");
        let row = sqlx::query(&sql).bind(reg_number.trim()).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_cab).transpose()
    }

    async fn delete(&self, id: CabId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM cabs WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        provider_id: Option<ProviderId>,
        page: PageRequest,
    ) -> Result<(Vec<Cab>, u64), RepositoryError> {
        let provider = provider_id.map(|id| id.0);
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cabs WHERE ? IS NULL OR provider_id = ?")
                .bind(provider)
                .bind(provider)
                .fetch_one(&self.pool)
                .await?;
        let sql = format!(
            "SELECT {CAB_COLUMNS} FROM cabs
             WHERE ? IS NULL OR provider_id = ?
             ORDER BY id DESC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(provider)
            .bind(provider)
            .bind(i64::from(page.size))
            .bind(i64::from(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let cabs = rows.iter().map(row_to_cab).collect::<Result<Vec<_>, _>>()?;
        Ok((cabs, total(count)))
    }
}

#[cfg(test)]
mod tests {
    use tembea_core::domain::fleet::{NewCab, NewDriver, NewProvider};
    use tembea_core::domain::page::PageRequest;

    use super::{
        CabRepository, DriverRepository, ProviderRepository, SqlCabRepository,
        SqlDriverRepository, SqlProviderRepository,
    };
    use crate::repositories::test_support::{setup, user};
    use crate::DbPool;

    async fn provider(pool: &DbPool) -> tembea_core::Provider {
        let owner = user(pool, "UPROVIDER", "provider@uber.com").await;
        SqlProviderRepository::new(pool.clone())
            .create(NewProvider {
                name: "Uber Kenya".to_string(),
                provider_user_id: owner.id,
                is_direct_message: false,
                channel_id: Some("CPROV".to_string()),
            })
            .await
            .expect("create provider")
    }

    fn new_driver(provider: &tembea_core::Provider, number: &str, phone: &str) -> NewDriver {
        NewDriver {
            driver_name: "James Savali".to_string(),
            driver_phone_no: phone.to_string(),
            driver_number: number.to_string(),
            email: None,
            provider_id: provider.id,
        }
    }

    #[tokio::test]
    async fn provider_is_found_through_owner_slack_id() {
        let pool = setup().await;
        let created = provider(&pool).await;
        let repo = SqlProviderRepository::new(pool);

        let found = repo.find_by_user_slack_id("UPROVIDER").await.expect("lookup");
        assert_eq!(found, Some(created));
        assert!(repo.find_by_user_slack_id("UNKNOWN").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn driver_exists_ignores_the_driver_being_updated() {
        let pool = setup().await;
        let owner = provider(&pool).await;
        let repo = SqlDriverRepository::new(pool);

        let driver = repo.create(new_driver(&owner, "DRV-1", "0700000001")).await.expect("create");

        assert!(repo.exists(None, Some("0700000001"), None, None).await.expect("exists"));
        assert!(!repo
            .exists(None, Some("0700000001"), None, Some(driver.id))
            .await
            .expect("exists"));
        assert!(!repo.exists(None, None, Some("DRV-2"), None).await.expect("exists"));
    }

    #[tokio::test]
    async fn drivers_are_listed_per_provider_and_deleted() {
        let pool = setup().await;
        let owner = provider(&pool).await;
        let repo = SqlDriverRepository::new(pool);
        let first = repo.create(new_driver(&owner, "DRV-1", "0700000001")).await.expect("first");
        repo.create(new_driver(&owner, "DRV-2", "0700000002")).await.expect("second");

        let (drivers, count) =
            repo.list(Some(owner.id), PageRequest::new(Some(1), Some(1))).await.expect("list");
        assert_eq!(count, 2);
        assert_eq!(drivers.len(), 1);

        assert!(repo.delete(first.id).await.expect("delete"));
        assert!(!repo.delete(first.id).await.expect("delete again"));
        assert!(repo.find_by_number("DRV-1").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn cabs_are_unique_by_registration() {
        let pool = setup().await;
        let owner = provider(&pool).await;
        let repo = SqlCabRepository::new(pool);
        let cab = NewCab {
            reg_number: "KCA 545".to_string(),
            model: "Toyota Noah".to_string(),
            capacity: 4,
            provider_id: owner.id,
        };

        let created = repo.create(cab.clone()).await.expect("create");
        assert!(repo.create(cab).await.expect_err("dup").is_unique_violation());
        assert_eq!(repo.find_by_reg_number("kca 545").await.expect("lookup"), Some(created));
    }
}
