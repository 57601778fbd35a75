//! Slack interaction handlers: buttons, menus and dialog submissions posted to
//! `/slack/actions`, looked up by the [`InteractionRouter`].

pub mod launch;
pub mod manager;
pub mod operations;
pub mod provider;
pub mod route_use;
pub mod trips;

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use tembea_core::cache::ConversationCache;
use tembea_core::validation::FieldError;
use tembea_slack::dialog::{DialogError, SlackDialog};
use tembea_slack::{HandlerError, HandlerOutcome, InteractionPayload, InteractionRouter};

use crate::state::Services;

/// Every handler the server answers Slack with.
pub fn router(services: Arc<Services>, cache: ConversationCache) -> InteractionRouter {
    let mut router = InteractionRouter::new();
    launch::register(&mut router);
    manager::register(&mut router, &services);
    operations::register(&mut router, &services);
    provider::register(&mut router, &services);
    route_use::register(&mut router, &services);
    trips::register(&mut router, &services, cache);
    router
}

pub(crate) fn team_id(payload: &InteractionPayload) -> Option<&str> {
    Some(payload.team.id.as_str()).filter(|team_id| !team_id.is_empty())
}

/// Opens `dialog` with the token of the team the payload came from.
pub(crate) async fn open_dialog(
    services: &Services,
    payload: &InteractionPayload,
    dialog: &SlackDialog,
) -> Result<(), HandlerError> {
    let trigger_id = payload
        .trigger_id
        .as_deref()
        .ok_or_else(|| HandlerError::InvalidPayload("interaction has no trigger_id".to_string()))?;
    let token = services.teams.token_for(team_id(payload)).await;
    services.teams.api().open_dialog(&token, trigger_id, dialog).await?;
    Ok(())
}

pub(crate) fn rejected(errors: Vec<FieldError>) -> HandlerOutcome {
    HandlerOutcome::ValidationErrors(errors.into_iter().map(DialogError::from).collect())
}

/// Parses an id or number carried in a button value, menu selection or dialog state.
pub(crate) fn parse<T>(value: Option<&str>, what: &str) -> Result<T, HandlerError>
where
    T: FromStr,
    T::Err: Display,
{
    let value = value.ok_or_else(|| HandlerError::InvalidPayload(format!("missing {what}")))?;
    value.trim().parse().map_err(|parse_error| {
        HandlerError::InvalidPayload(format!("{what} `{value}`: {parse_error}"))
    })
}

/// Decodes the JSON state a dialog was opened with.
pub(crate) fn dialog_state<T: DeserializeOwned>(
    payload: &InteractionPayload,
) -> Result<T, HandlerError> {
    payload
        .parse_state()
        .map_err(|state_error| HandlerError::InvalidPayload(state_error.to_string()))
}

pub(crate) fn unknown_action(name: Option<&str>) -> HandlerError {
    HandlerError::UnknownAction(name.unwrap_or_default().to_string())
}
