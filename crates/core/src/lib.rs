pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod names;
pub mod validation;

pub use cache::ConversationCache;
pub use domain::department::{Department, DepartmentSelector, NewDepartment};
pub use domain::fleet::{Cab, Driver, DriverChanges, NewCab, NewDriver, NewProvider, Provider};
pub use domain::ids::{
    AddressId, BatchUseRecordId, CabId, CountryId, DepartmentId, DriverId, HomebaseId, ProviderId,
    RoleId, RouteBatchId, RouteId, RouteRequestId, TripId, UserId,
};
pub use domain::page::{Page, PageMeta, PageRequest};
pub use domain::route::{Route, RouteBatch, RouteBatchDetails};
pub use domain::route_request::{RouteRequest, RouteRequestStatus};
pub use domain::trip::{Trip, TripStatus, TripType};
pub use domain::user::User;
pub use domain::EntityStatus;
pub use errors::{DomainError, InterfaceError, ServiceError};
