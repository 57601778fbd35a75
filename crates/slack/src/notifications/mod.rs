//! Outbound notifications.
//!
//! Delivery is best effort: failures are logged as captured errors and reported as
//! [`Delivery::Failed`], never raised. Nothing is retried.

pub mod operations;
pub mod provider;
pub mod route;
pub mod trip;

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{error, info};

use tembea_core::domain::fleet::{Provider, ProviderChannel};

use crate::client::{SlackApiError, SlackWebApi};
use crate::messages::SlackInteractiveMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Sends notifications with one team's bot token.
#[derive(Clone)]
pub struct Notifier {
    api: Arc<dyn SlackWebApi>,
    token: SecretString,
}

impl Notifier {
    pub fn new(api: Arc<dyn SlackWebApi>, token: SecretString) -> Self {
        Self { api, token }
    }

    pub fn api(&self) -> &Arc<dyn SlackWebApi> {
        &self.api
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub async fn send_dm(&self, slack_id: &str, message: &SlackInteractiveMessage) -> Delivery {
        let result = async {
            let channel = self.api.open_dm(&self.token, slack_id).await?;
            self.api.post_message(&self.token, &channel, message).await
        }
        .await;
        record("slack.notification.dm", slack_id, result.map(|_| ()))
    }

    pub async fn send_to_channel(
        &self,
        channel: &str,
        message: &SlackInteractiveMessage,
    ) -> Delivery {
        let result = self.api.post_message(&self.token, channel, message).await;
        record("slack.notification.channel", channel, result.map(|_| ()))
    }

    pub async fn update(
        &self,
        channel: &str,
        ts: &str,
        message: &SlackInteractiveMessage,
    ) -> Delivery {
        let result = self.api.update_message(&self.token, channel, ts, message).await;
        record("slack.notification.update", channel, result)
    }

    /// Providers get their channel when they opted out of DMs, otherwise a DM to
    /// `provider_slack_id`.
    pub async fn send_to_provider(
        &self,
        provider: &Provider,
        provider_slack_id: &str,
        message: &SlackInteractiveMessage,
    ) -> Delivery {
        match provider.notification_channel() {
            ProviderChannel::Channel(channel) => self.send_to_channel(&channel, message).await,
            ProviderChannel::DirectMessage => self.send_dm(provider_slack_id, message).await,
        }
    }
}

fn record(event: &'static str, recipient: &str, result: Result<(), SlackApiError>) -> Delivery {
    match result {
        Ok(()) => {
            info!(event_name = event, recipient, "notification delivered");
            Delivery::Sent
        }
        Err(delivery_error) => {
            error!(
                event_name = "error_tracker.captured",
                notification = event,
                recipient,
                error = %delivery_error,
                "notification delivery failed"
            );
            Delivery::Failed
        }
    }
}
