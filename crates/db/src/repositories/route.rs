use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{AddressId, CabId, DriverId, ProviderId, RouteBatchId, RouteId};
use tembea_core::domain::route::{
    parse_take_off, NewRoute, NewRouteBatch, Route, RouteBatch, TAKE_OFF_FORMAT,
};
use tembea_core::domain::EntityStatus;

use super::{column, parse_column, u32_column, RepositoryError};
use crate::DbPool;

const BATCH_COLUMNS: &str =
    "id, route_id, provider_id, cab_id, driver_id, take_off, capacity, batch, status";

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn find_route(&self, id: RouteId) -> Result<Option<Route>, RepositoryError>;
    async fn find_route_by_name(&self, name: &str) -> Result<Option<Route>, RepositoryError>;
    async fn create_route(&self, route: NewRoute) -> Result<Route, RepositoryError>;
    async fn create_batch(&self, batch: NewRouteBatch) -> Result<RouteBatch, RepositoryError>;
    async fn find_batch(&self, id: RouteBatchId) -> Result<Option<RouteBatch>, RepositoryError>;
    async fn update_batch(&self, batch: &RouteBatch) -> Result<(), RepositoryError>;
    /// Letters already used by the route's batches.
    async fn batch_letters(&self, route_id: RouteId) -> Result<Vec<String>, RepositoryError>;
    async fn list_active_batches(&self) -> Result<Vec<RouteBatch>, RepositoryError>;
}

pub struct SqlRouteRepository {
    pool: DbPool,
}

impl SqlRouteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_route(row: &SqliteRow) -> Result<Route, RepositoryError> {
    Ok(Route {
        id: RouteId(column(row, "id")?),
        name: column(row, "name")?,
        image_url: column(row, "image_url")?,
        destination_id: AddressId(column(row, "destination_id")?),
    })
}

fn row_to_batch(row: &SqliteRow) -> Result<RouteBatch, RepositoryError> {
    let take_off: String = column(row, "take_off")?;
    Ok(RouteBatch {
        id: RouteBatchId(column(row, "id")?),
        route_id: RouteId(column(row, "route_id")?),
        provider_id: column::<Option<i64>>(row, "provider_id")?.map(ProviderId),
        cab_id: column::<Option<i64>>(row, "cab_id")?.map(CabId),
        driver_id: column::<Option<i64>>(row, "driver_id")?.map(DriverId),
        take_off: parse_take_off(&take_off)?,
        capacity: u32_column(row, "capacity")?,
        batch: column(row, "batch")?,
        status: parse_column::<EntityStatus>(row, "status")?,
    })
}

#[async_trait]
impl RouteRepository for SqlRouteRepository {
    async fn find_route(&self, id: RouteId) -> Result<Option<Route>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, image_url, destination_id FROM routes WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_route).transpose()
    }

    async fn find_route_by_name(&self, name: &str) -> Result<Option<Route>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, image_url, destination_id FROM routes WHERE LOWER(name) = LOWER(?)",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_route).transpose()
    }

    async fn create_route(&self, route: NewRoute) -> Result<Route, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO routes (name, image_url, destination_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&route.name)
        .bind(&route.image_url)
        .bind(route.destination_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Route {
            id: RouteId(result.last_insert_rowid()),
            name: route.name,
            image_url: route.image_url,
            destination_id: route.destination_id,
        })
    }

    async fn create_batch(&self, batch: NewRouteBatch) -> Result<RouteBatch, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO route_batches
                 (route_id, provider_id, cab_id, driver_id, take_off, capacity, batch, status,
                  created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(batch.route_id.0)
        .bind(batch.provider_id.map(|id| id.0))
        .bind(batch.cab_id.map(|id| id.0))
        .bind(batch.driver_id.map(|id| id.0))
        .bind(batch.take_off.format(TAKE_OFF_FORMAT).to_string())
        .bind(i64::from(batch.capacity))
        .bind(&batch.batch)
        .bind(batch.status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(RouteBatch {
            id: RouteBatchId(result.last_insert_rowid()),
            route_id: batch.route_id,
            provider_id: batch.provider_id,
            cab_id: batch.cab_id,
            driver_id: batch.driver_id,
            take_off: batch.take_off,
            capacity: batch.capacity,
            batch: batch.batch,
            status: batch.status,
        })
    }

    async fn find_batch(&self, id: RouteBatchId) -> Result<Option<RouteBatch>, RepositoryError> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM route_batches WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_batch).transpose()
    }

    async fn update_batch(&self, batch: &RouteBatch) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE route_batches
             SET provider_id = ?, cab_id = ?, driver_id = ?, take_off = ?, capacity = ?,
                 batch = ?, status = ?
             WHERE id = ?",
        )
        .bind(batch.provider_id.map(|id| id.0))
        .bind(batch.cab_id.map(|id| id.0))
        .bind(batch.driver_id.map(|id| id.0))
        .bind(batch.take_off_label())
        .bind(i64::from(batch.capacity))
        .bind(&batch.batch)
        .bind(batch.status.as_str())
        .bind(batch.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn batch_letters(&self, route_id: RouteId) -> Result<Vec<String>, RepositoryError> {
        let letters: Vec<String> =
            sqlx::query_scalar("SELECT batch FROM route_batches WHERE route_id = ? ORDER BY batch")
                .bind(route_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(letters)
    }

    async fn list_active_batches(&self) -> Result<Vec<RouteBatch>, RepositoryError> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM route_batches WHERE status = 'Active' ORDER BY id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_batch).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use tembea_core::domain::location::NewAddress;
    use tembea_core::domain::route::{next_batch_letter, NewRoute, NewRouteBatch};
    use tembea_core::domain::EntityStatus;

    use super::{RouteRepository, SqlRouteRepository};
    use crate::repositories::test_support::setup;
    use crate::repositories::{LocationRepository, SqlLocationRepository};

    #[tokio::test]
    async fn batches_round_trip_take_off_and_letters() {
        let pool = setup().await;
        let destination = SqlLocationRepository::new(pool.clone())
            .create_address(NewAddress {
                address: "Thika Road Mall".to_string(),
                latitude: -1.219,
                longitude: 36.888,
            })
            .await
            .expect("address");
        let repo = SqlRouteRepository::new(pool);

        let route = repo
            .create_route(NewRoute {
                name: "Thika".to_string(),
                image_url: None,
                destination_id: destination.id,
            })
            .await
            .expect("route");

        let template = NewRouteBatch {
            route_id: route.id,
            provider_id: None,
            cab_id: None,
            driver_id: None,
            take_off: NaiveTime::from_hms_opt(17, 30, 0).expect("time"),
            capacity: 4,
            batch: "A".to_string(),
            status: EntityStatus::Active,
        };
        let first = repo.create_batch(template.clone()).await.expect("batch A");

        let letters = repo.batch_letters(route.id).await.expect("letters");
        let second = repo
            .create_batch(NewRouteBatch { batch: next_batch_letter(&letters), ..template })
            .await
            .expect("batch B");
        assert_eq!(second.batch, "B");

        let mut stored = repo.find_batch(first.id).await.expect("find").expect("present");
        assert_eq!(stored.take_off_label(), "17:30");

        stored.status = EntityStatus::Inactive;
        repo.update_batch(&stored).await.expect("update");

        let active = repo.list_active_batches().await.expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }
}
