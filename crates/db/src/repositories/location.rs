use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{AddressId, CountryId, HomebaseId};
use tembea_core::domain::location::{Address, Country, Homebase, NewAddress};

use super::{column, RepositoryError};
use crate::DbPool;

/// Countries, homebases and addresses.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, RepositoryError>;
    async fn find_homebase(&self, id: HomebaseId) -> Result<Option<Homebase>, RepositoryError>;
    async fn find_homebase_by_name(&self, name: &str)
        -> Result<Option<Homebase>, RepositoryError>;
    async fn create_homebase(
        &self,
        name: &str,
        country_id: CountryId,
    ) -> Result<Homebase, RepositoryError>;
    async fn find_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError>;
    async fn find_address_by_text(&self, address: &str)
        -> Result<Option<Address>, RepositoryError>;
    async fn create_address(&self, address: NewAddress) -> Result<Address, RepositoryError>;
}

pub struct SqlLocationRepository {
    pool: DbPool,
}

impl SqlLocationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_homebase(row: &SqliteRow) -> Result<Homebase, RepositoryError> {
    Ok(Homebase {
        id: HomebaseId(column(row, "id")?),
        name: column(row, "name")?,
        country_id: CountryId(column(row, "country_id")?),
    })
}

pub(crate) fn row_to_address(row: &SqliteRow) -> Result<Address, RepositoryError> {
    Ok(Address {
        id: AddressId(column(row, "id")?),
        address: column(row, "address")?,
        latitude: column(row, "latitude")?,
        longitude: column(row, "longitude")?,
    })
}

#[async_trait]
impl LocationRepository for SqlLocationRepository {
    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM countries WHERE LOWER(name) = LOWER(?)")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(ref r) => {
                Ok(Some(Country { id: CountryId(column(r, "id")?), name: column(r, "name")? }))
            }
            None => Ok(None),
        }
    }

    async fn find_homebase(&self, id: HomebaseId) -> Result<Option<Homebase>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, country_id FROM homebases WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_homebase).transpose()
    }

    async fn find_homebase_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Homebase>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, country_id FROM homebases WHERE LOWER(name) = LOWER(?)")
                .bind(name.trim())
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_homebase).transpose()
    }

    async fn create_homebase(
        &self,
        name: &str,
        country_id: CountryId,
    ) -> Result<Homebase, RepositoryError> {
        let name = name.trim();
        let result = sqlx::query("INSERT INTO homebases (name, country_id) VALUES (?, ?)")
            .bind(name)
            .bind(country_id.0)
            .execute(&self.pool)
            .await?;
        Ok(Homebase {
            id: HomebaseId(result.last_insert_rowid()),
            name: name.to_string(),
            country_id,
        })
    }

    async fn find_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, address, latitude, longitude FROM addresses WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_address).transpose()
    }

    async fn find_address_by_text(
        &self,
        address: &str,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, address, latitude, longitude FROM addresses
             WHERE LOWER(address) = LOWER(?)",
        )
        .bind(address.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_address).transpose()
    }

    async fn create_address(&self, address: NewAddress) -> Result<Address, RepositoryError> {
        let text = address.address.trim().to_string();
        let result =
            sqlx::query("INSERT INTO addresses (address, latitude, longitude) VALUES (?, ?, ?)")
                .bind(&text)
                .bind(address.latitude)
                .bind(address.longitude)
                .execute(&self.pool)
                .await?;
        Ok(Address {
            id: AddressId(result.last_insert_rowid()),
            address: text,
            latitude: address.latitude,
            longitude: address.longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use tembea_core::domain::location::NewAddress;

    use super::{LocationRepository, SqlLocationRepository};
    use crate::repositories::test_support::setup;

    #[tokio::test]
    async fn homebase_belongs_to_a_seeded_country() {
        let pool = setup().await;
        let repo = SqlLocationRepository::new(pool);

        let kenya = repo.find_country_by_name("kenya").await.expect("lookup").expect("seeded");
        let nairobi = repo.create_homebase("Nairobi", kenya.id).await.expect("create");

        let found = repo.find_homebase_by_name("NAIROBI").await.expect("lookup").expect("present");
        assert_eq!(found, nairobi);
        assert!(repo
            .create_homebase("Nairobi", kenya.id)
            .await
            .expect_err("dup")
            .is_unique_violation());
    }

    #[tokio::test]
    async fn addresses_are_found_by_text() {
        let pool = setup().await;
        let repo = SqlLocationRepository::new(pool);

        let created = repo
            .create_address(NewAddress {
                address: " Epic Tower ".to_string(),
                latitude: -1.219,
                longitude: 36.886,
            })
            .await
            .expect("create");

        assert_eq!(created.address, "Epic Tower");
        let found =
            repo.find_address_by_text("epic tower").await.expect("lookup").expect("present");
        assert_eq!(found.id, created.id);
        assert_eq!(repo.find_address(created.id).await.expect("by id"), Some(created));
    }
}
