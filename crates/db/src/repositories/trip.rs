use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::ids::{CabId, DriverId, ProviderId, TripId, UserId};
use tembea_core::domain::trip::{NewTrip, Trip, TripStatus, TripType};

use super::{column, parse_column, timestamp_column, to_timestamp, u32_column, RepositoryError};
use crate::DbPool;

const TRIP_COLUMNS: &str = "id, name, rider_id, requested_by_id, origin, destination, \
                            departure_time, trip_type, no_of_passengers, reason, status, \
                            provider_id, cab_id, driver_id, approved_by_id, manager_comment, \
                            operations_comment, created_at";

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create(&self, trip: NewTrip) -> Result<Trip, RepositoryError>;
    async fn find_by_id(&self, id: TripId) -> Result<Option<Trip>, RepositoryError>;
    async fn update(&self, trip: &Trip) -> Result<(), RepositoryError>;
    /// Trips in any of `statuses`, optionally only those departing after the instant.
    async fn list(
        &self,
        statuses: &[TripStatus],
        departing_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trip>, RepositoryError>;
}

pub struct SqlTripRepository {
    pool: DbPool,
}

impl SqlTripRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_trip(row: &SqliteRow) -> Result<Trip, RepositoryError> {
    Ok(Trip {
        id: TripId(column(row, "id")?),
        name: column(row, "name")?,
        rider_id: UserId(column(row, "rider_id")?),
        requested_by_id: UserId(column(row, "requested_by_id")?),
        origin: column(row, "origin")?,
        destination: column(row, "destination")?,
        departure_time: timestamp_column(row, "departure_time")?,
        trip_type: parse_column::<TripType>(row, "trip_type")?,
        no_of_passengers: u32_column(row, "no_of_passengers")?,
        reason: column(row, "reason")?,
        status: parse_column::<TripStatus>(row, "status")?,
        provider_id: column::<Option<i64>>(row, "provider_id")?.map(ProviderId),
        cab_id: column::<Option<i64>>(row, "cab_id")?.map(CabId),
        driver_id: column::<Option<i64>>(row, "driver_id")?.map(DriverId),
        approved_by_id: column::<Option<i64>>(row, "approved_by_id")?.map(UserId),
        manager_comment: column(row, "manager_comment")?,
        operations_comment: column(row, "operations_comment")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

#[async_trait]
impl TripRepository for SqlTripRepository {
    async fn create(&self, trip: NewTrip) -> Result<Trip, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO trips
                 (name, rider_id, requested_by_id, origin, destination, departure_time,
                  trip_type, no_of_passengers, reason, status, provider_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&trip.name)
        .bind(trip.rider_id.0)
        .bind(trip.requested_by_id.0)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(to_timestamp(trip.departure_time))
        .bind(trip.trip_type.as_str())
        .bind(i64::from(trip.no_of_passengers))
        .bind(&trip.reason)
        .bind(TripStatus::Pending.as_str())
        .bind(trip.provider_id.map(|id| id.0))
        .bind(to_timestamp(now))
        .execute(&self.pool)
        .await?;

        Ok(Trip {
            id: TripId(result.last_insert_rowid()),
            name: trip.name,
            rider_id: trip.rider_id,
            requested_by_id: trip.requested_by_id,
            origin: trip.origin,
            destination: trip.destination,
            departure_time: trip.departure_time,
            trip_type: trip.trip_type,
            no_of_passengers: trip.no_of_passengers,
            reason: trip.reason,
            status: TripStatus::Pending,
            provider_id: trip.provider_id,
            cab_id: None,
            driver_id: None,
            approved_by_id: None,
            manager_comment: None,
            operations_comment: None,
            created_at: now,
        })
    }

    async fn find_by_id(&self, id: TripId) -> Result<Option<Trip>, RepositoryError> {
        let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_trip).transpose()
    }

    async fn update(&self, trip: &Trip) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE trips
             SET name = ?, origin = ?, destination = ?, departure_time = ?, trip_type = ?,
                 no_of_passengers = ?, reason = ?, status = ?, provider_id = ?, cab_id = ?,
                 driver_id = ?, approved_by_id = ?, manager_comment = ?, operations_comment = ?
             WHERE id = ?",
        )
        .bind(&trip.name)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(to_timestamp(trip.departure_time))
        .bind(trip.trip_type.as_str())
        .bind(i64::from(trip.no_of_passengers))
        .bind(&trip.reason)
        .bind(trip.status.as_str())
        .bind(trip.provider_id.map(|id| id.0))
        .bind(trip.cab_id.map(|id| id.0))
        .bind(trip.driver_id.map(|id| id.0))
        .bind(trip.approved_by_id.map(|id| id.0))
        .bind(&trip.manager_comment)
        .bind(&trip.operations_comment)
        .bind(trip.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        statuses: &[TripStatus],
        departing_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trip>, RepositoryError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {TRIP_COLUMNS} FROM trips
             WHERE status IN ({placeholders}) AND (? IS NULL OR departure_time > ?)
             ORDER BY departure_time"
        );
        let after = departing_after.map(to_timestamp);

        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.bind(after.clone()).bind(after).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_trip).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use tembea_core::domain::trip::{NewTrip, TripStatus, TripType};

    use super::{SqlTripRepository, TripRepository};
    use crate::repositories::test_support::{setup, user};

    #[tokio::test]
    async fn list_filters_by_status_and_departure() {
        let pool = setup().await;
        let rider = user(&pool, "URIDER", "rider@andela.com").await;
        let repo = SqlTripRepository::new(pool);
        let now = Utc::now();

        let template = NewTrip {
            name: "From Epic Tower to JKIA".to_string(),
            rider_id: rider.id,
            requested_by_id: rider.id,
            origin: "Epic Tower".to_string(),
            destination: "JKIA".to_string(),
            departure_time: now + Duration::hours(3),
            trip_type: TripType::Airport,
            no_of_passengers: 1,
            reason: Some("Conference".to_string()),
            provider_id: None,
        };

        let upcoming = repo.create(template.clone()).await.expect("upcoming");
        let mut past = repo
            .create(NewTrip { departure_time: now - Duration::hours(3), ..template.clone() })
            .await
            .expect("past");
        let mut confirmed = repo.create(template).await.expect("confirmed");

        past.status = TripStatus::Confirmed;
        repo.update(&past).await.expect("update past");
        confirmed.status = TripStatus::Confirmed;
        repo.update(&confirmed).await.expect("update confirmed");

        let pending = repo.list(&[TripStatus::Pending], None).await.expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, upcoming.id);

        let future_confirmed =
            repo.list(&[TripStatus::Confirmed], Some(now)).await.expect("confirmed");
        assert_eq!(future_confirmed.len(), 1);
        assert_eq!(future_confirmed[0].id, confirmed.id);
        assert_eq!(future_confirmed[0].trip_type, TripType::Airport);
    }
}
