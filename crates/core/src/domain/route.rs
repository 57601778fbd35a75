use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::fleet::{Cab, Driver, Provider};
use crate::domain::ids::{AddressId, CabId, DriverId, ProviderId, RouteBatchId, RouteId};
use crate::domain::location::Address;
use crate::domain::EntityStatus;
use crate::errors::DomainError;

pub const TAKE_OFF_FORMAT: &str = "%H:%M";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub image_url: Option<String>,
    pub destination_id: AddressId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRoute {
    pub name: String,
    pub image_url: Option<String>,
    pub destination_id: AddressId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBatch {
    pub id: RouteBatchId,
    pub route_id: RouteId,
    pub provider_id: Option<ProviderId>,
    pub cab_id: Option<CabId>,
    pub driver_id: Option<DriverId>,
    #[serde(with = "take_off_serde")]
    pub take_off: NaiveTime,
    pub capacity: u32,
    pub batch: String,
    pub status: EntityStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRouteBatch {
    pub route_id: RouteId,
    pub provider_id: Option<ProviderId>,
    pub cab_id: Option<CabId>,
    pub driver_id: Option<DriverId>,
    pub take_off: NaiveTime,
    pub capacity: u32,
    pub batch: String,
    pub status: EntityStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBatchChanges {
    pub take_off: Option<String>,
    pub capacity: Option<u32>,
    pub status: Option<EntityStatus>,
    pub provider_id: Option<ProviderId>,
    pub cab_id: Option<CabId>,
    pub driver_id: Option<DriverId>,
}

impl RouteBatch {
    pub fn take_off_label(&self) -> String {
        self.take_off.format(TAKE_OFF_FORMAT).to_string()
    }

    /// Applies the changes and reports whether the batch was switched off.
    pub fn apply(&mut self, changes: RouteBatchChanges) -> Result<bool, DomainError> {
        let was_active = self.status.is_active();
        if let Some(take_off) = changes.take_off {
            self.take_off = parse_take_off(&take_off)?;
        }
        if let Some(capacity) = changes.capacity {
            if capacity == 0 {
                return Err(DomainError::InvariantViolation(
                    "capacity must be a non-zero integer greater than zero".to_string(),
                ));
            }
            self.capacity = capacity;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if changes.provider_id.is_some() {
            self.provider_id = changes.provider_id;
        }
        if changes.cab_id.is_some() {
            self.cab_id = changes.cab_id;
        }
        if changes.driver_id.is_some() {
            self.driver_id = changes.driver_id;
        }
        Ok(was_active && !self.status.is_active())
    }

    /// The next instant (UTC) at which this batch leaves, strictly after `now`.
    pub fn next_take_off_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(self.take_off));
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Template for a duplicate batch of the same route under the next letter.
    pub fn duplicate(&self, existing_batches: &[String]) -> NewRouteBatch {
        NewRouteBatch {
            route_id: self.route_id,
            provider_id: self.provider_id,
            cab_id: self.cab_id,
            driver_id: self.driver_id,
            take_off: self.take_off,
            capacity: self.capacity,
            batch: next_batch_letter(existing_batches),
            status: self.status,
        }
    }
}

/// Everything needed to describe a batch to riders and providers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBatchDetails {
    pub batch: RouteBatch,
    pub route: Route,
    pub destination: Address,
    pub provider: Option<Provider>,
    pub cab: Option<Cab>,
    pub driver: Option<Driver>,
}

impl RouteBatchDetails {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.route.name, self.batch.batch)
    }
}

pub fn parse_take_off(value: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value.trim(), TAKE_OFF_FORMAT)
        .map_err(|_| DomainError::InvalidTakeOffTime(value.to_string()))
}

/// Batches are lettered A, B, C... in creation order; after Z come AA, AB...
pub fn next_batch_letter(existing: &[String]) -> String {
    let highest = existing.iter().filter_map(|batch| batch_index(batch)).max().unwrap_or(0);
    batch_label(highest.saturating_add(1))
}

/// `A` is 1, `Z` is 26, `AA` is 27. Anything that is not upper-case letters is skipped.
fn batch_index(label: &str) -> Option<u64> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    label.chars().try_fold(0u64, |index, letter| {
        if !letter.is_ascii_uppercase() {
            return None;
        }
        index.checked_mul(26)?.checked_add(u64::from(letter as u8 - b'A') + 1)
    })
}

fn batch_label(mut index: u64) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push(char::from(b'A' + (index % 26) as u8));
        index /= 26;
    }
    letters.iter().rev().collect()
}

mod take_off_serde {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_take_off, TAKE_OFF_FORMAT};

    pub fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TAKE_OFF_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_take_off(&raw).map_err(serde::de::Error::custom)
    }
}
