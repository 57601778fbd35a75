//! Slack Web API access.
//!
//! `SlackWebApi` is the seam every Slack side effect goes through. Production uses
//! [`HttpSlackClient`]; tests use [`RecordingSlackApi`], which keeps every call.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use tembea_core::domain::user::SlackProfile;
use tembea_core::errors::ServiceError;

use crate::dialog::SlackDialog;
use crate::messages::SlackInteractiveMessage;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack transport failure calling {method}: {message}")]
    Transport { method: String, message: String },
    #[error("slack api `{method}` returned error `{code}`")]
    Api { method: String, code: String },
    #[error("slack api `{method}` returned an unexpected body: {message}")]
    Decode { method: String, message: String },
}

impl From<SlackApiError> for ServiceError {
    fn from(error: SlackApiError) -> Self {
        ServiceError::Integration(error.to_string())
    }
}

/// Where a posted message landed; needed to update it later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

#[async_trait]
pub trait SlackWebApi: Send + Sync {
    async fn post_message(
        &self,
        token: &SecretString,
        channel: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<MessageRef, SlackApiError>;

    async fn update_message(
        &self,
        token: &SecretString,
        channel: &str,
        ts: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<(), SlackApiError>;

    /// Opens (or reuses) the DM channel with `user_id` and returns its id.
    async fn open_dm(&self, token: &SecretString, user_id: &str) -> Result<String, SlackApiError>;

    async fn open_dialog(
        &self,
        token: &SecretString,
        trigger_id: &str,
        dialog: &SlackDialog,
    ) -> Result<(), SlackApiError>;

    async fn user_info(&self, token: &SecretString, user_id: &str)
        -> Result<SlackProfile, SlackApiError>;

    async fn lookup_by_email(
        &self,
        token: &SecretString,
        email: &str,
    ) -> Result<SlackProfile, SlackApiError>;

    /// Posts to an interaction's `response_url`; no token required.
    async fn respond(
        &self,
        response_url: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<(), SlackApiError>;
}

pub struct HttpSlackClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSlackClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| SlackApiError::Transport {
                method: "client.build".to_owned(),
                message: error.to_string(),
            })?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_owned() })
    }

    async fn call(
        &self,
        method: &str,
        token: &SecretString,
        body: Value,
    ) -> Result<Value, SlackApiError> {
        let url = format!("{}/{method}", self.base_url);
        debug!(event_name = "slack.api.call", method, "calling slack web api");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport(method, error))?;
        let payload: Value = response.json().await.map_err(|error| SlackApiError::Decode {
            method: method.to_owned(),
            message: error.to_string(),
        })?;

        if payload.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(payload)
        } else {
            let code = payload.get("error").and_then(Value::as_str).unwrap_or("unknown_error");
            Err(SlackApiError::Api { method: method.to_owned(), code: code.to_owned() })
        }
    }

    async fn fetch_profile(
        &self,
        method: &str,
        token: &SecretString,
        body: Value,
    ) -> Result<SlackProfile, SlackApiError> {
        let payload = self.call(method, token, body).await?;
        let user = payload.get("user").cloned().unwrap_or(Value::Null);
        let raw: RawSlackUser = serde_json::from_value(user).map_err(|error| {
            SlackApiError::Decode { method: method.to_owned(), message: error.to_string() }
        })?;
        Ok(raw.into_profile())
    }
}

fn transport(method: &str, error: reqwest::Error) -> SlackApiError {
    SlackApiError::Transport { method: method.to_owned(), message: error.to_string() }
}

fn message_body(message: &SlackInteractiveMessage) -> Result<Value, SlackApiError> {
    serde_json::to_value(message).map_err(|error| SlackApiError::Decode {
        method: "serialize".to_owned(),
        message: error.to_string(),
    })
}

fn with_field(mut body: Value, key: &str, value: &str) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert(key.to_owned(), Value::String(value.to_owned()));
    }
    body
}

#[derive(Deserialize)]
struct RawSlackUser {
    id: String,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    tz_offset: Option<i64>,
    #[serde(default)]
    profile: RawSlackUserProfile,
}

#[derive(Default, Deserialize)]
struct RawSlackUserProfile {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl RawSlackUser {
    fn into_profile(self) -> SlackProfile {
        SlackProfile {
            id: self.id,
            real_name: self.real_name.or(self.profile.real_name).unwrap_or_default(),
            email: self.profile.email.unwrap_or_default(),
            tz_offset: self.tz_offset,
        }
    }
}

#[async_trait]
impl SlackWebApi for HttpSlackClient {
    async fn post_message(
        &self,
        token: &SecretString,
        channel: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<MessageRef, SlackApiError> {
        let body = with_field(message_body(message)?, "channel", channel);
        let payload = self.call("chat.postMessage", token, body).await?;
        Ok(MessageRef {
            channel: payload.get("channel").and_then(Value::as_str).unwrap_or(channel).to_owned(),
            ts: payload.get("ts").and_then(Value::as_str).unwrap_or_default().to_owned(),
        })
    }

    async fn update_message(
        &self,
        token: &SecretString,
        channel: &str,
        ts: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<(), SlackApiError> {
        let body = with_field(with_field(message_body(message)?, "channel", channel), "ts", ts);
        self.call("chat.update", token, body).await.map(|_| ())
    }

    async fn open_dm(&self, token: &SecretString, user_id: &str) -> Result<String, SlackApiError> {
        let payload = self.call("conversations.open", token, json!({ "users": user_id })).await?;
        payload
            .pointer("/channel/id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| SlackApiError::Decode {
                method: "conversations.open".to_owned(),
                message: "missing channel.id".to_owned(),
            })
    }

    async fn open_dialog(
        &self,
        token: &SecretString,
        trigger_id: &str,
        dialog: &SlackDialog,
    ) -> Result<(), SlackApiError> {
        let body = json!({ "trigger_id": trigger_id, "dialog": dialog });
        self.call("dialog.open", token, body).await.map(|_| ())
    }

    async fn user_info(
        &self,
        token: &SecretString,
        user_id: &str,
    ) -> Result<SlackProfile, SlackApiError> {
        self.fetch_profile("users.info", token, json!({ "user": user_id })).await
    }

    async fn lookup_by_email(
        &self,
        token: &SecretString,
        email: &str,
    ) -> Result<SlackProfile, SlackApiError> {
        self.fetch_profile("users.lookupByEmail", token, json!({ "email": email })).await
    }

    async fn respond(
        &self,
        response_url: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<(), SlackApiError> {
        let response = self
            .http
            .post(response_url)
            .json(&message_body(message)?)
            .send()
            .await
            .map_err(|error| transport("response_url", error))?;
        response.error_for_status().map(|_| ()).map_err(|error| transport("response_url", error))
    }
}

/// One call made against [`RecordingSlackApi`].
#[derive(Clone, Debug, PartialEq)]
pub enum SlackCall {
    PostMessage { channel: String, message: SlackInteractiveMessage },
    UpdateMessage { channel: String, ts: String, message: SlackInteractiveMessage },
    OpenDm { user_id: String },
    OpenDialog { trigger_id: String, dialog: SlackDialog },
    UserInfo { user_id: String },
    LookupByEmail { email: String },
    Respond { response_url: String, message: SlackInteractiveMessage },
}

/// In-memory `SlackWebApi` that records calls instead of sending them.
///
/// DM channels are `D<user id>`. Profiles must be registered with
/// [`RecordingSlackApi::with_profile`]; unknown users fail with `users_not_found`.
#[derive(Default)]
pub struct RecordingSlackApi {
    calls: Mutex<Vec<SlackCall>>,
    profiles: HashMap<String, SlackProfile>,
    failing: bool,
}

impl RecordingSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `channel_not_found`, after being recorded.
    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn with_profile(mut self, profile: SlackProfile) -> Self {
        self.profiles.insert(profile.id.clone(), profile);
        self
    }

    pub async fn calls(&self) -> Vec<SlackCall> {
        self.calls.lock().await.clone()
    }

    pub async fn posted_messages(&self) -> Vec<(String, SlackInteractiveMessage)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                SlackCall::PostMessage { channel, message } => {
                    Some((channel.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub async fn opened_dialogs(&self) -> Vec<SlackDialog> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                SlackCall::OpenDialog { dialog, .. } => Some(dialog.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn updated_messages(&self) -> Vec<SlackInteractiveMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                SlackCall::UpdateMessage { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, method: &str, call: SlackCall) -> Result<(), SlackApiError> {
        self.calls.lock().await.push(call);
        if self.failing {
            return Err(SlackApiError::Api {
                method: method.to_owned(),
                code: "channel_not_found".to_owned(),
            });
        }
        Ok(())
    }

    fn profile(
        &self,
        method: &str,
        matches: impl Fn(&SlackProfile) -> bool,
    ) -> Result<SlackProfile, SlackApiError> {
        self.profiles.values().find(|profile| matches(profile)).cloned().ok_or_else(|| {
            SlackApiError::Api { method: method.to_owned(), code: "users_not_found".to_owned() }
        })
    }
}

#[async_trait]
impl SlackWebApi for RecordingSlackApi {
    async fn post_message(
        &self,
        _token: &SecretString,
        channel: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<MessageRef, SlackApiError> {
        let call = SlackCall::PostMessage { channel: channel.to_owned(), message: message.clone() };
        self.record("chat.postMessage", call).await?;
        Ok(MessageRef { channel: channel.to_owned(), ts: "1554291432.000100".to_owned() })
    }

    async fn update_message(
        &self,
        _token: &SecretString,
        channel: &str,
        ts: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<(), SlackApiError> {
        let call = SlackCall::UpdateMessage {
            channel: channel.to_owned(),
            ts: ts.to_owned(),
            message: message.clone(),
        };
        self.record("chat.update", call).await
    }

    async fn open_dm(&self, _token: &SecretString, user_id: &str) -> Result<String, SlackApiError> {
        self.record("conversations.open", SlackCall::OpenDm { user_id: user_id.to_owned() }).await?;
        Ok(format!("D{user_id}"))
    }

    async fn open_dialog(
        &self,
        _token: &SecretString,
        trigger_id: &str,
        dialog: &SlackDialog,
    ) -> Result<(), SlackApiError> {
        let call = SlackCall::OpenDialog {
            trigger_id: trigger_id.to_owned(),
            dialog: dialog.clone(),
        };
        self.record("dialog.open", call).await
    }

    async fn user_info(
        &self,
        _token: &SecretString,
        user_id: &str,
    ) -> Result<SlackProfile, SlackApiError> {
        self.record("users.info", SlackCall::UserInfo { user_id: user_id.to_owned() }).await?;
        self.profile("users.info", |profile| profile.id == user_id)
    }

    async fn lookup_by_email(
        &self,
        _token: &SecretString,
        email: &str,
    ) -> Result<SlackProfile, SlackApiError> {
        self.record("users.lookupByEmail", SlackCall::LookupByEmail { email: email.to_owned() })
            .await?;
        self.profile("users.lookupByEmail", |profile| profile.email.eq_ignore_ascii_case(email))
    }

    async fn respond(
        &self,
        response_url: &str,
        message: &SlackInteractiveMessage,
    ) -> Result<(), SlackApiError> {
        let call =
            SlackCall::Respond { response_url: response_url.to_owned(), message: message.clone() };
        self.record("response_url", call).await
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use tembea_core::domain::user::SlackProfile;

    use super::{RawSlackUser, RecordingSlackApi, SlackApiError, SlackCall, SlackWebApi};
    use crate::messages::SlackInteractiveMessage;

    fn token() -> SecretString {
        SecretString::from("xoxb-test".to_owned())
    }

    #[tokio::test]
    async fn recording_api_keeps_calls_in_order() {
        let api = RecordingSlackApi::new();
        let channel = api.open_dm(&token(), "U1").await.expect("dm");
        api.post_message(&token(), &channel, &SlackInteractiveMessage::new("hello"))
            .await
            .expect("post");

        let calls = api.calls().await;
        assert_eq!(calls[0], SlackCall::OpenDm { user_id: "U1".to_owned() });
        assert_eq!(
            api.posted_messages().await,
            vec![("DU1".to_owned(), SlackInteractiveMessage::new("hello"))]
        );
    }

    #[tokio::test]
    async fn lookup_by_email_uses_registered_profiles() {
        let api = RecordingSlackApi::new().with_profile(SlackProfile {
            id: "U9".to_owned(),
            real_name: "Tembea Devs".to_owned(),
            email: "tembea.devs@andela.com".to_owned(),
            tz_offset: Some(10800),
        });

        let found = api.lookup_by_email(&token(), "Tembea.Devs@andela.com").await.expect("found");
        assert_eq!(found.id, "U9");

        let missing = api.user_info(&token(), "UNKNOWN").await;
        assert!(matches!(
            missing,
            Err(SlackApiError::Api { code, .. }) if code == "users_not_found"
        ));
    }

    #[tokio::test]
    async fn failing_api_records_then_errors() {
        let api = RecordingSlackApi::failing();
        let result = api
            .respond("https://hooks.slack.com/1", &SlackInteractiveMessage::new("x"))
            .await;

        assert!(result.is_err());
        assert_eq!(api.calls().await.len(), 1);
    }

    #[test]
    fn raw_user_prefers_top_level_real_name() {
        let raw: RawSlackUser = serde_json::from_value(serde_json::json!({
            "id": "U1",
            "real_name": "Ada Lovelace",
            "tz_offset": 3600,
            "profile": { "real_name": "Ada", "email": "ada@andela.com" }
        }))
        .expect("decode");
        let profile = raw.into_profile();

        assert_eq!(profile.real_name, "Ada Lovelace");
        assert_eq!(profile.email, "ada@andela.com");
        assert_eq!(profile.tz_offset, Some(3600));
    }
}
