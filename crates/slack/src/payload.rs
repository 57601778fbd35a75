//! Incoming interaction payloads (`payload=` form field on `/slack/actions`).
//!
//! One struct covers legacy attachment actions, dialog submissions and Block Kit
//! `block_actions`; fields a given kind does not use are left empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadTeam {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

impl PayloadAction {
    /// Button value, or the first selected option for menus.
    pub fn effective_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .or_else(|| self.selected_options.first().map(|option| option.value.as_str()))
            .or_else(|| self.selected_option.as_ref().map(|option| option.value.as_str()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalMessage {
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContainer {
    #[serde(default)]
    pub message_ts: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<PayloadAction>,
    #[serde(default)]
    pub submission: Option<Map<String, Value>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub user: PayloadUser,
    #[serde(default)]
    pub team: PayloadTeam,
    #[serde(default)]
    pub channel: Option<PayloadChannel>,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub message_ts: Option<String>,
    #[serde(default)]
    pub original_message: Option<OriginalMessage>,
    #[serde(default)]
    pub container: Option<MessageContainer>,
}

impl InteractionPayload {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn is_dialog_submission(&self) -> bool {
        self.kind == "dialog_submission"
    }

    pub fn first_action(&self) -> Option<&PayloadAction> {
        self.actions.first()
    }

    /// Legacy button `name`, falling back to the Block Kit `action_id`.
    pub fn action_name(&self) -> Option<&str> {
        self.first_action()
            .and_then(|action| action.name.as_deref().or(action.action_id.as_deref()))
    }

    pub fn action_value(&self) -> Option<&str> {
        self.first_action().and_then(PayloadAction::effective_value)
    }

    /// A submitted dialog value. Blank strings and `null` read as missing.
    pub fn submission_value(&self, name: &str) -> Option<String> {
        let value = self.submission.as_ref()?.get(name)?;
        let text = match value {
            Value::String(text) => text.trim().to_owned(),
            Value::Null => return None,
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|channel| channel.id.as_str())
    }

    /// Timestamp of the message the interaction came from.
    pub fn message_timestamp(&self) -> Option<&str> {
        self.original_message
            .as_ref()
            .and_then(|message| message.ts.as_deref())
            .or(self.message_ts.as_deref())
            .or_else(|| {
                self.container
                    .as_ref()
                    .and_then(|container| container.message_ts.as_deref())
            })
    }

    /// `andela-tembea.slack.com` style URL for the team, when Slack sent the domain.
    pub fn team_url(&self) -> Option<String> {
        self.team.domain.as_ref().map(|domain| format!("{domain}.slack.com"))
    }

    /// Parses the JSON `state` a dialog was opened with.
    pub fn parse_state<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.state.as_deref().unwrap_or("{}"))
    }

    /// Copy with surrounding whitespace removed from submitted values.
    pub fn trimmed(&self) -> Self {
        let mut payload = self.clone();
        if let Some(submission) = payload.submission.as_mut() {
            for value in submission.values_mut() {
                if let Value::String(text) = value {
                    *text = text.trim().to_owned();
                }
            }
        }
        for action in &mut payload.actions {
            if let Some(value) = action.value.as_mut() {
                *value = value.trim().to_owned();
            }
        }
        payload
    }
}
