//! Routes Slack interactions to their handlers.
//!
//! Handlers are keyed by Block Kit `(block_id, action_id)`, by exact `callback_id`,
//! or by a `callback_id` prefix such as `operations_route_`. A payload is matched
//! against those keys in that order; the longest matching prefix wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use tembea_core::errors::ServiceError;

use crate::client::SlackApiError;
use crate::dialog::DialogError;
use crate::messages::{
    goodbye_message, SlackInteractiveMessage, UNABLE_TO_DO_THAT, UNSUCCESSFUL_REQUEST,
};
use crate::payload::InteractionPayload;
use crate::respond::Responder;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Action { block_id: String, action_id: String },
    Callback(String),
    CallbackPrefix(String),
}

impl RouteKey {
    pub fn action(block_id: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self::Action { block_id: block_id.into(), action_id: action_id.into() }
    }

    pub fn callback(callback_id: impl Into<String>) -> Self {
        Self::Callback(callback_id.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::CallbackPrefix(prefix.into())
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action { block_id, action_id } => write!(f, "{block_id}__{action_id}"),
            Self::Callback(callback_id) => f.write_str(callback_id),
            Self::CallbackPrefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled,
    ValidationErrors(Vec<DialogError>),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid interaction payload: {0}")]
    InvalidPayload(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Slack(#[from] SlackApiError),
    #[error("{0}")]
    Service(String),
    #[error("{0}")]
    Unsuccessful(String),
}

impl From<ServiceError> for HandlerError {
    fn from(error: ServiceError) -> Self {
        Self::Service(error.to_string())
    }
}

impl HandlerError {
    /// What the user sees when the handler fails.
    pub fn reply(&self) -> &'static str {
        match self {
            Self::Unsuccessful(_) => UNSUCCESSFUL_REQUEST,
            _ => UNABLE_TO_DO_THAT,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to send interaction reply: {0}")]
    Respond(#[from] SlackApiError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    ValidationErrors(Vec<DialogError>),
    Unmatched,
    Failed,
}

#[async_trait]
pub trait InteractionHandler: Send + Sync {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError>;
}

#[derive(Default)]
pub struct InteractionRouter {
    handlers: HashMap<RouteKey, Arc<dyn InteractionHandler>>,
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `key`, replacing any previous handler for that key.
    pub fn register<H>(&mut self, key: RouteKey, handler: H)
    where
        H: InteractionHandler + 'static,
    {
        self.handlers.insert(key, Arc::new(handler));
    }

    pub fn register_shared(&mut self, key: RouteKey, handler: Arc<dyn InteractionHandler>) {
        self.handlers.insert(key, handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Finds the handler for a payload along with the key that matched.
    pub fn resolve(
        &self,
        payload: &InteractionPayload,
    ) -> Option<(RouteKey, Arc<dyn InteractionHandler>)> {
        if let Some(action) = payload.first_action() {
            if let (Some(block_id), Some(action_id)) = (&action.block_id, &action.action_id) {
                let key = RouteKey::action(block_id.clone(), action_id.clone());
                if let Some(handler) = self.handlers.get(&key) {
                    return Some((key, Arc::clone(handler)));
                }
            }
        }

        let callback_id = payload.callback_id.as_deref()?;
        let exact = RouteKey::callback(callback_id);
        if let Some(handler) = self.handlers.get(&exact) {
            return Some((exact, Arc::clone(handler)));
        }

        self.handlers
            .iter()
            .filter_map(|(key, handler)| match key {
                RouteKey::CallbackPrefix(prefix) if callback_id.starts_with(prefix.as_str()) => {
                    Some((prefix.len(), key, handler))
                }
                _ => None,
            })
            .max_by_key(|(length, _, _)| *length)
            .map(|(_, key, handler)| (key.clone(), Arc::clone(handler)))
    }

    pub async fn dispatch(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<DispatchOutcome, DispatchError> {
        let callback_id = payload.callback_id.as_deref().unwrap_or_default();
        let Some((key, handler)) = self.resolve(payload) else {
            warn!(
                event_name = "slack.interaction.unmatched",
                callback_id,
                user_id = %payload.user.id,
                "no handler registered for interaction"
            );
            respond.respond(goodbye_message()).await?;
            return Ok(DispatchOutcome::Unmatched);
        };

        match handler.handle(payload, respond).await {
            Ok(HandlerOutcome::Handled) => {
                info!(
                    event_name = "slack.interaction.dispatched",
                    route = %key,
                    callback_id,
                    user_id = %payload.user.id,
                    "interaction handled"
                );
                Ok(DispatchOutcome::Handled)
            }
            Ok(HandlerOutcome::ValidationErrors(errors)) => {
                info!(
                    event_name = "slack.interaction.rejected",
                    route = %key,
                    error_count = errors.len(),
                    "dialog submission failed validation"
                );
                Ok(DispatchOutcome::ValidationErrors(errors))
            }
            Err(handler_error) => {
                error!(
                    event_name = "error_tracker.captured",
                    route = %key,
                    callback_id,
                    user_id = %payload.user.id,
                    error = %handler_error,
                    "interaction handler failed"
                );
                respond.respond(SlackInteractiveMessage::new(handler_error.reply())).await?;
                Ok(DispatchOutcome::Failed)
            }
        }
    }
}
