use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::{AddressId, RouteRequestId, UserId};
use crate::domain::location::Address;
use crate::domain::user::User;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteRequestStatus {
    Pending,
    Confirmed,
    Approved,
    Declined,
}

impl RouteRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Approved => "Approved",
            Self::Declined => "Declined",
        }
    }

    /// Operations already acted on the request.
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Approved | Self::Declined)
    }
}

impl fmt::Display for RouteRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteRequestStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Approved" => Ok(Self::Approved),
            "Declined" => Ok(Self::Declined),
            other => {
                Err(DomainError::UnknownStatus { kind: "route request", value: other.to_string() })
            }
        }
    }
}

/// Why operations may not act on a route request right now.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReviewBlocked {
    #[error("This request has already been {}", .0.as_str().to_lowercase())]
    AlreadyProcessed(RouteRequestStatus),
    #[error("This request needs to be confirmed by the manager first")]
    AwaitingManager,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub id: RouteRequestId,
    pub fellow_id: UserId,
    pub manager_id: Option<UserId>,
    pub ops_reviewer_id: Option<UserId>,
    pub home_id: AddressId,
    pub bus_stop_id: AddressId,
    pub route_image_url: Option<String>,
    pub distance: Option<f64>,
    pub manager_comment: Option<String>,
    pub ops_comment: Option<String>,
    pub status: RouteRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RouteRequest {
    /// Operations may only review requests the manager confirmed and nobody processed.
    pub fn check_reviewable(&self) -> Result<(), ReviewBlocked> {
        validate_route_status(self.status)
    }
}

pub fn validate_route_status(status: RouteRequestStatus) -> Result<(), ReviewBlocked> {
    if status.is_processed() {
        return Err(ReviewBlocked::AlreadyProcessed(status));
    }
    if status != RouteRequestStatus::Confirmed {
        return Err(ReviewBlocked::AwaitingManager);
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewRouteRequest {
    pub fellow_id: UserId,
    pub manager_id: Option<UserId>,
    pub home_id: AddressId,
    pub bus_stop_id: AddressId,
    pub route_image_url: Option<String>,
    pub distance: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteRequestChanges {
    pub status: Option<RouteRequestStatus>,
    pub ops_reviewer_id: Option<UserId>,
    pub ops_comment: Option<String>,
    pub manager_comment: Option<String>,
}

impl RouteRequest {
    pub fn apply(&mut self, changes: RouteRequestChanges, now: DateTime<Utc>) {
        if let Some(status) = changes.status {
            self.status = status;
        }
        if changes.ops_reviewer_id.is_some() {
            self.ops_reviewer_id = changes.ops_reviewer_id;
        }
        if changes.ops_comment.is_some() {
            self.ops_comment = changes.ops_comment;
        }
        if changes.manager_comment.is_some() {
            self.manager_comment = changes.manager_comment;
        }
        self.updated_at = now;
    }
}

/// A route request with its people and places resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRequestDetails {
    pub request: RouteRequest,
    pub fellow: User,
    pub manager: Option<User>,
    pub ops_reviewer: Option<User>,
    pub home: Address,
    pub bus_stop: Address,
}
