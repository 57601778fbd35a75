use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use tembea_core::errors::{DomainError, ServiceError};

pub mod department;
pub mod fleet;
pub mod location;
pub mod role;
pub mod route;
pub mod route_request;
pub mod team;
pub mod trip;
pub mod usage;
pub mod user;

pub use department::{DepartmentRepository, SqlDepartmentRepository};
pub use fleet::{
    CabRepository, DriverRepository, ProviderRepository, SqlCabRepository, SqlDriverRepository,
    SqlProviderRepository,
};
pub use location::{LocationRepository, SqlLocationRepository};
pub use role::{RoleRepository, SqlRoleRepository};
pub use route::{RouteRepository, SqlRouteRepository};
pub use route_request::{RouteRequestRepository, SqlRouteRequestRepository};
pub use team::{SqlTeamDetailsRepository, TeamDetailsRepository};
pub use trip::{SqlTripRepository, TripRepository};
pub use usage::{BatchUseRepository, SqlBatchUseRepository};
pub use user::{SqlUserRepository, UserRepository};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// True when the statement failed on a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(error)) => error.is_unique_violation(),
            _ => false,
        }
    }
}

/// Unique violations surface as conflicts; everything else is a persistence failure.
impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        if error.is_unique_violation() {
            return ServiceError::Conflict(
                "A record with the same unique value already exists".to_string(),
            );
        }
        ServiceError::Persistence(error.to_string())
    }
}

impl From<DomainError> for RepositoryError {
    fn from(error: DomainError) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Fixed-width RFC 3339 so stored instants compare correctly as text.
pub(crate) fn to_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn parse_column<T>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = column(row, name)?;
    Ok(raw.parse::<T>()?)
}

pub(crate) fn u32_column(row: &SqliteRow, name: &str) -> Result<u32, RepositoryError> {
    let raw: i64 = column(row, name)?;
    u32::try_from(raw).map_err(|_| RepositoryError::Decode(format!("`{name}` out of range: {raw}")))
}

pub(crate) fn timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("`{name}` is not RFC 3339: {e}")))
}

pub(crate) fn date_column(row: &SqliteRow, name: &str) -> Result<NaiveDate, RepositoryError> {
    let raw: String = column(row, name)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("`{name}` is not a date: {e}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use tembea_core::domain::user::NewUser;
    use tembea_core::User;

    use super::{SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    pub async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    pub async fn user(pool: &DbPool, slack_id: &str, email: &str) -> User {
        SqlUserRepository::new(pool.clone())
            .create(NewUser {
                name: "Test User".to_string(),
                slack_id: slack_id.to_string(),
                email: email.to_string(),
                phone_no: None,
            })
            .await
            .expect("create user")
    }
}
