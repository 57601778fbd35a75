use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{CabId, DriverId, ProviderId, TripId, UserId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripStatus {
    Pending,
    Approved,
    DeclinedByManager,
    Confirmed,
    DeclinedByOps,
    Cancelled,
    InTransit,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::DeclinedByManager => "DeclinedByManager",
            Self::Confirmed => "Confirmed",
            Self::DeclinedByOps => "DeclinedByOps",
            Self::Cancelled => "Cancelled",
            Self::InTransit => "InTransit",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "DeclinedByManager" => Ok(Self::DeclinedByManager),
            "Confirmed" => Ok(Self::Confirmed),
            "DeclinedByOps" => Ok(Self::DeclinedByOps),
            "Cancelled" => Ok(Self::Cancelled),
            "InTransit" => Ok(Self::InTransit),
            "Completed" => Ok(Self::Completed),
            other => Err(DomainError::UnknownStatus { kind: "trip", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripType {
    #[serde(rename = "Regular Trip")]
    Regular,
    #[serde(rename = "Airport Transfer")]
    Airport,
    #[serde(rename = "Embassy Visit")]
    Embassy,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "Regular Trip",
            Self::Airport => "Airport Transfer",
            Self::Embassy => "Embassy Visit",
        }
    }
}

impl FromStr for TripType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Regular Trip" => Ok(Self::Regular),
            "Airport Transfer" => Ok(Self::Airport),
            "Embassy Visit" => Ok(Self::Embassy),
            other => {
                Err(DomainError::UnknownStatus { kind: "trip type", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    pub rider_id: UserId,
    pub requested_by_id: UserId,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub trip_type: TripType,
    pub no_of_passengers: u32,
    pub reason: Option<String>,
    pub status: TripStatus,
    pub provider_id: Option<ProviderId>,
    pub cab_id: Option<CabId>,
    pub driver_id: Option<DriverId>,
    pub approved_by_id: Option<UserId>,
    pub manager_comment: Option<String>,
    pub operations_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_cancelled(&self) -> bool {
        self.status == TripStatus::Cancelled
    }

    /// Managers act only on trips still waiting for them.
    pub fn awaiting_manager(&self) -> bool {
        self.status == TripStatus::Pending
    }

    pub fn approve(&mut self, manager_id: UserId, comment: impl Into<String>) -> bool {
        if !self.awaiting_manager() {
            return false;
        }
        self.status = TripStatus::Approved;
        self.approved_by_id = Some(manager_id);
        self.manager_comment = Some(comment.into());
        true
    }

    pub fn decline(&mut self, manager_id: UserId, comment: impl Into<String>) -> bool {
        if !self.awaiting_manager() {
            return false;
        }
        self.status = TripStatus::DeclinedByManager;
        self.approved_by_id = Some(manager_id);
        self.manager_comment = Some(comment.into());
        true
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewTrip {
    pub name: String,
    pub rider_id: UserId,
    pub requested_by_id: UserId,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub trip_type: TripType,
    pub no_of_passengers: u32,
    pub reason: Option<String>,
    pub provider_id: Option<ProviderId>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Trip, TripStatus, TripType};
    use crate::domain::ids::{TripId, UserId};

    fn trip(status: TripStatus) -> Trip {
        Trip {
            id: TripId(3),
            name: "From Epic Tower to JKIA".to_string(),
            rider_id: UserId(1),
            requested_by_id: UserId(1),
            origin: "Epic Tower".to_string(),
            destination: "JKIA".to_string(),
            departure_time: Utc::now(),
            trip_type: TripType::Airport,
            no_of_passengers: 1,
            reason: None,
            status,
            provider_id: None,
            cab_id: None,
            driver_id: None,
            approved_by_id: None,
            manager_comment: None,
            operations_comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_pending_trips_can_be_approved() {
        let mut pending = trip(TripStatus::Pending);
        assert!(pending.approve(UserId(9), "ok"));
        assert_eq!(pending.status, TripStatus::Approved);
        assert_eq!(pending.approved_by_id, Some(UserId(9)));

        let mut cancelled = trip(TripStatus::Cancelled);
        assert!(!cancelled.approve(UserId(9), "ok"));
        assert_eq!(cancelled.status, TripStatus::Cancelled);
    }

    #[test]
    fn trip_type_uses_display_labels() {
        assert_eq!("Embassy Visit".parse::<TripType>().expect("parse"), TripType::Embassy);
        assert_eq!(TripType::Regular.as_str(), "Regular Trip");
    }
}
