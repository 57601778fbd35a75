use serde::{Deserialize, Serialize};

use crate::domain::ids::{CabId, DriverId, ProviderId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub provider_user_id: UserId,
    pub is_direct_message: bool,
    pub channel_id: Option<String>,
}

/// Where provider notifications are delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderChannel {
    Channel(String),
    DirectMessage,
}

impl Provider {
    /// Providers that opted out of direct messages are notified in their channel,
    /// falling back to a DM when no channel was configured.
    pub fn notification_channel(&self) -> ProviderChannel {
        match (&self.channel_id, self.is_direct_message) {
            (Some(channel), false) if !channel.trim().is_empty() => {
                ProviderChannel::Channel(channel.clone())
            }
            _ => ProviderChannel::DirectMessage,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProvider {
    pub name: String,
    pub provider_user_id: UserId,
    pub is_direct_message: bool,
    pub channel_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub driver_name: String,
    pub driver_phone_no: String,
    pub driver_number: String,
    pub email: Option<String>,
    pub provider_id: ProviderId,
    pub user_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriver {
    pub driver_name: String,
    pub driver_phone_no: String,
    pub driver_number: String,
    pub email: Option<String>,
    pub provider_id: ProviderId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverChanges {
    pub driver_name: Option<String>,
    pub driver_phone_no: Option<String>,
    pub driver_number: Option<String>,
    pub email: Option<String>,
}

impl Driver {
    pub fn apply(&mut self, changes: DriverChanges) {
        if let Some(name) = changes.driver_name {
            self.driver_name = name;
        }
        if let Some(phone) = changes.driver_phone_no {
            self.driver_phone_no = phone;
        }
        if let Some(number) = changes.driver_number {
            self.driver_number = number;
        }
        if let Some(email) = changes.email {
            self.email = Some(email);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cab {
    pub id: CabId,
    pub reg_number: String,
    pub model: String,
    pub capacity: u32,
    pub provider_id: ProviderId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCab {
    pub reg_number: String,
    pub model: String,
    pub capacity: u32,
    pub provider_id: ProviderId,
}
