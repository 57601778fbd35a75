use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{AddressId, RouteRequestId, UserId};
use tembea_core::domain::route_request::{NewRouteRequest, RouteRequest, RouteRequestStatus};

use super::{column, parse_column, timestamp_column, RepositoryError};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, fellow_id, manager_id, ops_reviewer_id, home_id, bus_stop_id, \
                               route_image_url, distance, manager_comment, ops_comment, status, \
                               created_at, updated_at";

#[async_trait]
pub trait RouteRequestRepository: Send + Sync {
    async fn create(&self, request: NewRouteRequest) -> Result<RouteRequest, RepositoryError>;
    async fn find_by_id(&self, id: RouteRequestId)
        -> Result<Option<RouteRequest>, RepositoryError>;
    async fn update(&self, request: &RouteRequest) -> Result<(), RepositoryError>;
}

pub struct SqlRouteRequestRepository {
    pool: DbPool,
}

impl SqlRouteRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_request(row: &SqliteRow) -> Result<RouteRequest, RepositoryError> {
    Ok(RouteRequest {
        id: RouteRequestId(column(row, "id")?),
        fellow_id: UserId(column(row, "fellow_id")?),
        manager_id: column::<Option<i64>>(row, "manager_id")?.map(UserId),
        ops_reviewer_id: column::<Option<i64>>(row, "ops_reviewer_id")?.map(UserId),
        home_id: AddressId(column(row, "home_id")?),
        bus_stop_id: AddressId(column(row, "bus_stop_id")?),
        route_image_url: column(row, "route_image_url")?,
        distance: column(row, "distance")?,
        manager_comment: column(row, "manager_comment")?,
        ops_comment: column(row, "ops_comment")?,
        status: parse_column::<RouteRequestStatus>(row, "status")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[async_trait]
impl RouteRequestRepository for SqlRouteRequestRepository {
    async fn create(&self, request: NewRouteRequest) -> Result<RouteRequest, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO route_requests
                 (fellow_id, manager_id, home_id, bus_stop_id, route_image_url, distance,
                  status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.fellow_id.0)
        .bind(request.manager_id.map(|id| id.0))
        .bind(request.home_id.0)
        .bind(request.bus_stop_id.0)
        .bind(&request.route_image_url)
        .bind(request.distance)
        .bind(RouteRequestStatus::Pending.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(RouteRequest {
            id: RouteRequestId(result.last_insert_rowid()),
            fellow_id: request.fellow_id,
            manager_id: request.manager_id,
            ops_reviewer_id: None,
            home_id: request.home_id,
            bus_stop_id: request.bus_stop_id,
            route_image_url: request.route_image_url,
            distance: request.distance,
            manager_comment: None,
            ops_comment: None,
            status: RouteRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(
        &self,
        id: RouteRequestId,
    ) -> Result<Option<RouteRequest>, RepositoryError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM route_requests WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_request).transpose()
    }

    async fn update(&self, request: &RouteRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE route_requests
             SET manager_id = ?, ops_reviewer_id = ?, route_image_url = ?, distance = ?,
                 manager_comment = ?, ops_comment = ?, status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(request.manager_id.map(|id| id.0))
        .bind(request.ops_reviewer_id.map(|id| id.0))
        .bind(&request.route_image_url)
        .bind(request.distance)
        .bind(&request.manager_comment)
        .bind(&request.ops_comment)
        .bind(request.status.as_str())
        .bind(request.updated_at.to_rfc3339())
        .bind(request.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use tembea_core::domain::location::NewAddress;
    use tembea_core::domain::route_request::{
        NewRouteRequest, RouteRequestChanges, RouteRequestStatus,
    };

    use super::{RouteRequestRepository, SqlRouteRequestRepository};
    use crate::repositories::test_support::{setup, user};
    use crate::repositories::{LocationRepository, SqlLocationRepository};

    #[tokio::test]
    async fn status_changes_are_persisted() {
        let pool = setup().await;
        let fellow = user(&pool, "UFELLOW", "fellow@andela.com").await;
        let locations = SqlLocationRepository::new(pool.clone());
        let home = locations
            .create_address(NewAddress {
                address: "Kilimani".to_string(),
                latitude: 0.0,
                longitude: 0.0,
            })
            .await
            .expect("home");
        let stop = locations
            .create_address(NewAddress {
                address: "Yaya".to_string(),
                latitude: 0.0,
                longitude: 0.0,
            })
            .await
            .expect("stop");
        let repo = SqlRouteRequestRepository::new(pool);

        let mut request = repo
            .create(NewRouteRequest {
                fellow_id: fellow.id,
                manager_id: None,
                home_id: home.id,
                bus_stop_id: stop.id,
                route_image_url: None,
                distance: Some(2.5),
            })
            .await
            .expect("create");
        assert_eq!(request.status, RouteRequestStatus::Pending);

        request.apply(
            RouteRequestChanges {
                status: Some(RouteRequestStatus::Declined),
                ops_comment: Some("No capacity".to_string()),
                ..RouteRequestChanges::default()
            },
            Utc::now(),
        );
        repo.update(&request).await.expect("update");

        let stored = repo.find_by_id(request.id).await.expect("find").expect("present");
        assert_eq!(stored.status, RouteRequestStatus::Declined);
        assert_eq!(stored.ops_comment.as_deref(), Some("No capacity"));
        assert_eq!(stored.distance, Some(2.5));
    }
}
