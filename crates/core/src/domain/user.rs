use serde::{Deserialize, Serialize};

use crate::domain::ids::{HomebaseId, RouteBatchId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub slack_id: String,
    pub email: String,
    pub phone_no: Option<String>,
    pub default_homebase_id: Option<HomebaseId>,
    pub route_batch_id: Option<RouteBatchId>,
}

impl User {
    /// Slack mention markup, e.g. `<@U123>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.slack_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub slack_id: String,
    pub email: String,
    pub phone_no: Option<String>,
}

/// Profile fields read from Slack `users.info` / `users.lookupByEmail`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackProfile {
    pub id: String,
    pub real_name: String,
    pub email: String,
    pub tz_offset: Option<i64>,
}

impl From<SlackProfile> for NewUser {
    fn from(profile: SlackProfile) -> Self {
        Self { name: profile.real_name, slack_id: profile.id, email: profile.email, phone_no: None }
    }
}
