use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{SlackApiError, SlackWebApi};
use crate::messages::SlackInteractiveMessage;

/// The reply channel for a single interaction.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, message: SlackInteractiveMessage) -> Result<(), SlackApiError>;
}

/// Replies through the interaction's `response_url`.
pub struct ResponseUrlResponder {
    api: Arc<dyn SlackWebApi>,
    response_url: String,
}

impl ResponseUrlResponder {
    pub fn new(api: Arc<dyn SlackWebApi>, response_url: impl Into<String>) -> Self {
        Self { api, response_url: response_url.into() }
    }
}

#[async_trait]
impl Responder for ResponseUrlResponder {
    async fn respond(&self, message: SlackInteractiveMessage) -> Result<(), SlackApiError> {
        self.api.respond(&self.response_url, &message).await
    }
}

/// Keeps replies in memory. Used where no `response_url` exists and in tests.
#[derive(Default)]
pub struct RecordingResponder {
    messages: Mutex<Vec<SlackInteractiveMessage>>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<SlackInteractiveMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn texts(&self) -> Vec<String> {
        self.messages.lock().await.iter().map(|message| message.text.clone()).collect()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn respond(&self, message: SlackInteractiveMessage) -> Result<(), SlackApiError> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}
