//! Domain services: repository calls plus the light business rules around them.
//!
//! Every service turns a missing record into `ServiceError::NotFound` with the message
//! API clients see.

pub mod department;
pub mod fleet;
pub mod homebase;
pub mod role;
pub mod route;
pub mod route_request;
pub mod team;
pub mod trip;
pub mod user;

use std::sync::Arc;

use tembea_core::domain::route::{RouteBatch, RouteBatchDetails};
use tembea_core::domain::route_request::{RouteRequest, RouteRequestDetails};
use tembea_core::errors::ServiceError;
use tembea_core::User;
use tembea_core::UserId;
use tembea_db::repositories::{
    BatchUseRepository, CabRepository, DepartmentRepository, DriverRepository,
    LocationRepository, ProviderRepository, RoleRepository, RouteRepository,
    RouteRequestRepository, SqlBatchUseRepository, SqlCabRepository, SqlDepartmentRepository,
    SqlDriverRepository, SqlLocationRepository, SqlProviderRepository, SqlRoleRepository,
    SqlRouteRepository, SqlRouteRequestRepository, SqlTeamDetailsRepository, SqlTripRepository,
    SqlUserRepository, TeamDetailsRepository, TripRepository, UserRepository,
};
use tembea_db::DbPool;

pub use department::DepartmentService;
pub use fleet::{CabService, DriverService, ProviderService};
pub use homebase::HomebaseService;
pub use role::RoleService;
pub use route::RouteService;
pub use route_request::RouteRequestService;
pub use team::TeamDetailsService;
pub use trip::TripService;
pub use user::UserService;

/// Shared repository handles. Cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub providers: Arc<dyn ProviderRepository>,
    pub drivers: Arc<dyn DriverRepository>,
    pub cabs: Arc<dyn CabRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub route_requests: Arc<dyn RouteRequestRepository>,
    pub trips: Arc<dyn TripRepository>,
    pub teams: Arc<dyn TeamDetailsRepository>,
    pub batch_use: Arc<dyn BatchUseRepository>,
}

impl Repositories {
    pub fn sql(pool: &DbPool) -> Self {
        Self {
            users: Arc::new(SqlUserRepository::new(pool.clone())),
            departments: Arc::new(SqlDepartmentRepository::new(pool.clone())),
            roles: Arc::new(SqlRoleRepository::new(pool.clone())),
            locations: Arc::new(SqlLocationRepository::new(pool.clone())),
            providers: Arc::new(SqlProviderRepository::new(pool.clone())),
            drivers: Arc::new(SqlDriverRepository::new(pool.clone())),
            cabs: Arc::new(SqlCabRepository::new(pool.clone())),
            routes: Arc::new(SqlRouteRepository::new(pool.clone())),
            route_requests: Arc::new(SqlRouteRequestRepository::new(pool.clone())),
            trips: Arc::new(SqlTripRepository::new(pool.clone())),
            teams: Arc::new(SqlTeamDetailsRepository::new(pool.clone())),
            batch_use: Arc::new(SqlBatchUseRepository::new(pool.clone())),
        }
    }

    pub async fn user(&self, id: UserId) -> Result<User, ServiceError> {
        self.users.find_by_id(id).await?.ok_or_else(|| ServiceError::not_found("User not found"))
    }

    async fn optional_user(&self, id: Option<UserId>) -> Result<Option<User>, ServiceError> {
        match id {
            Some(id) => Ok(self.users.find_by_id(id).await?),
            None => Ok(None),
        }
    }

    /// Route, destination, provider, cab and driver of a batch.
    pub async fn batch_details(
        &self,
        batch: RouteBatch,
    ) -> Result<RouteBatchDetails, ServiceError> {
        let route = self
            .routes
            .find_route(batch.route_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route does not exist"))?;
        let destination = self
            .locations
            .find_address(route.destination_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Address not found"))?;
        let provider = match batch.provider_id {
            Some(id) => self.providers.find_by_id(id).await?,
            None => None,
        };
        let cab = match batch.cab_id {
            Some(id) => self.cabs.find_by_id(id).await?,
            None => None,
        };
        let driver = match batch.driver_id {
            Some(id) => self.drivers.find_by_id(id).await?,
            None => None,
        };
        Ok(RouteBatchDetails { batch, route, destination, provider, cab, driver })
    }

    /// Fellow, manager, reviewer, home and bus stop of a route request.
    pub async fn route_request_details(
        &self,
        request: RouteRequest,
    ) -> Result<RouteRequestDetails, ServiceError> {
        let fellow = self.user(request.fellow_id).await?;
        let manager = self.optional_user(request.manager_id).await?;
        let ops_reviewer = self.optional_user(request.ops_reviewer_id).await?;
        let home = self
            .locations
            .find_address(request.home_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Home address not found"))?;
        let bus_stop = self
            .locations
            .find_address(request.bus_stop_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Bus stop not found"))?;
        Ok(RouteRequestDetails { request, fellow, manager, ops_reviewer, home, bus_stop })
    }
}
