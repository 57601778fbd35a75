use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

macro_rules! entity_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i64> for $name {
                fn from(value: i64) -> Self {
                    Self(value)
                }
            }

            impl FromStr for $name {
                type Err = DomainError;

                fn from_str(value: &str) -> Result<Self, Self::Err> {
                    value
                        .trim()
                        .parse::<i64>()
                        .map(Self)
                        .map_err(|_| DomainError::InvalidIdentifier(value.to_string()))
                }
            }
        )+
    };
}

entity_id!(
    UserId,
    DepartmentId,
    RoleId,
    HomebaseId,
    CountryId,
    AddressId,
    RouteId,
    RouteBatchId,
    RouteRequestId,
    TripId,
    ProviderId,
    DriverId,
    CabId,
    BatchUseRecordId,
);
