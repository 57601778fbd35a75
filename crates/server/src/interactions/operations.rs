//! Operations reviewing route requests from the card in their channel.
//!
//! Every callback starts with `operations_route_`: the `actions` card buttons and the
//! `declinedRequest` and `approvedRequest` dialogs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use tembea_core::domain::ids::{ProviderId, RouteRequestId};
use tembea_core::domain::route::parse_take_off;
use tembea_core::domain::route_request::{ReviewBlocked, RouteRequestDetails};
use tembea_core::validation::{validate_reason, FieldError, Violations};
use tembea_core::{PageRequest, User};
use tembea_slack::dialog::{reason_dialog, route_approval_dialog, DialogOption};
use tembea_slack::messages::text_message;
use tembea_slack::notifications::operations::{OPS_APPROVE, OPS_DECLINE};
use tembea_slack::{
    HandlerError, HandlerOutcome, InteractionHandler, InteractionPayload, InteractionRouter,
    Responder, RouteKey,
};

use super::{dialog_state, open_dialog, parse, rejected, team_id, unknown_action};
use crate::services::route::RouteApproval;
use crate::services::route_request::Review;
use crate::state::Services;

pub const OPS_PREFIX: &str = "operations_route_";
pub const DECLINED_REQUEST_CALLBACK: &str = "operations_route_declinedRequest";
pub const APPROVED_REQUEST_CALLBACK: &str = "operations_route_approvedRequest";
pub const DECLINE_REASON: &str = "declineReason";

const PROVIDER_OPTIONS: u32 = 100;
const CAPACITY_INVALID: &str = "Capacity must be a number greater than zero";
const TAKE_OFF_INVALID: &str = "Take-off time must be in the format hh:mm";

pub fn register(router: &mut InteractionRouter, services: &Arc<Services>) {
    let handler = OperationsRouteHandler { services: Arc::clone(services) };
    router.register(RouteKey::prefix(OPS_PREFIX), handler);
}

/// Carried by both review dialogs so the card can be rewritten afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsDialogState {
    pub time_stamp: String,
    pub channel_id: String,
    pub route_request_id: String,
}

impl OpsDialogState {
    fn request_id(&self) -> Result<RouteRequestId, HandlerError> {
        parse(Some(self.route_request_id.as_str()), "route request id")
    }
}

/// Checks the approval dialog and turns it into a [`RouteApproval`].
pub fn approval_from_submission(
    payload: &InteractionPayload,
) -> Result<RouteApproval, Vec<FieldError>> {
    let route_name = payload.submission_value("routeName").unwrap_or_default();
    let capacity = payload.submission_value("routeCapacity").unwrap_or_default();
    let take_off = payload.submission_value("takeOffTime").unwrap_or_default();
    let provider = payload.submission_value("provider").unwrap_or_default();

    let parsed_capacity = capacity.parse::<u32>().ok().filter(|capacity| *capacity > 0);
    let parsed_provider = provider.parse::<ProviderId>().ok();
    Violations::new()
        .require("routeName", &route_name)
        .check(parsed_capacity.is_some(), "routeCapacity", CAPACITY_INVALID)
        .check(parse_take_off(&take_off).is_ok(), "takeOffTime", TAKE_OFF_INVALID)
        .check(parsed_provider.is_some(), "provider", "Please select a provider")
        .finish()?;

    match (parsed_capacity, parsed_provider) {
        (Some(capacity), Some(provider_id)) => {
            Ok(RouteApproval { route_name, take_off, capacity, provider_id })
        }
        _ => Err(vec![FieldError::new("routeCapacity", CAPACITY_INVALID)]),
    }
}

pub struct OperationsRouteHandler {
    services: Arc<Services>,
}

impl OperationsRouteHandler {
    async fn reviewer(&self, payload: &InteractionPayload) -> Result<User, HandlerError> {
        Ok(self
            .services
            .users
            .find_or_create_by_slack_id(&payload.user.id, team_id(payload))
            .await?)
    }

    /// Rewrites the ops card to the request's current state.
    async fn refresh_card(
        &self,
        payload: &InteractionPayload,
        channel: &str,
        ts: &str,
        details: &RouteRequestDetails,
    ) {
        if channel.is_empty() || ts.is_empty() {
            return;
        }
        let notifier = self.services.teams.notifier_for(team_id(payload)).await;
        notifier.update_ops_message(channel, ts, details).await;
    }

    async fn card_action(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let request_id: RouteRequestId = parse(payload.action_value(), "route request id")?;
        let channel = payload.channel_id().unwrap_or_default();
        let ts = payload.message_timestamp().unwrap_or_default();
        let (details, _) = self
            .services
            .route_requests
            .get_route_request_and_token(request_id, team_id(payload))
            .await?;

        match details.request.check_reviewable() {
            Err(ReviewBlocked::AlreadyProcessed(status)) => {
                info!(
                    event_name = "routes.request.already_processed",
                    route_request_id = request_id.0,
                    status = %status,
                    "route request was reviewed before"
                );
                self.refresh_card(payload, channel, ts, &details).await;
                return Ok(HandlerOutcome::Handled);
            }
            Err(blocked @ ReviewBlocked::AwaitingManager) => {
                respond.respond(text_message(blocked.to_string())).await?;
                return Ok(HandlerOutcome::Handled);
            }
            Ok(()) => {}
        }

        let state = serde_json::to_string(&OpsDialogState {
            time_stamp: ts.to_string(),
            channel_id: channel.to_string(),
            route_request_id: request_id.to_string(),
        })
        .map_err(|encode_error| HandlerError::InvalidPayload(encode_error.to_string()))?;

        let dialog = match payload.action_name() {
            Some(OPS_APPROVE) => {
                let page = PageRequest::new(Some(1), Some(PROVIDER_OPTIONS));
                let (providers, _) = self
                    .services
                    .repos
                    .providers
                    .list(page)
                    .await
                    .map_err(|lookup_error| HandlerError::Service(lookup_error.to_string()))?;
                let options = providers
                    .iter()
                    .map(|provider| DialogOption::new(&provider.name, provider.id.to_string()))
                    .collect();
                route_approval_dialog(APPROVED_REQUEST_CALLBACK, &state, options)
            }
            Some(OPS_DECLINE) => {
                reason_dialog(
                    DECLINED_REQUEST_CALLBACK,
                    &state,
                    "Decline",
                    "Decline",
                    DECLINE_REASON,
                )
            }
            other => return Err(unknown_action(other)),
        };
        open_dialog(&self.services, payload, &dialog).await?;
        Ok(HandlerOutcome::Handled)
    }

    async fn declined(&self, payload: &InteractionPayload) -> Result<HandlerOutcome, HandlerError> {
        let reason = payload.submission_value(DECLINE_REASON).unwrap_or_default();
        let errors = validate_reason(DECLINE_REASON, &reason);
        if !errors.is_empty() {
            return Ok(rejected(errors));
        }
        let state: OpsDialogState = dialog_state(payload)?;
        let reviewer = self.reviewer(payload).await?;

        let details = match self
            .services
            .route_requests
            .decline_route_request(state.request_id()?, &reviewer, &reason, team_id(payload))
            .await?
        {
            Review::Done(declined) => declined,
            Review::Blocked(_, current) => *current,
        };
        self.refresh_card(payload, &state.channel_id, &state.time_stamp, &details).await;
        Ok(HandlerOutcome::Handled)
    }

    async fn approved(&self, payload: &InteractionPayload) -> Result<HandlerOutcome, HandlerError> {
        let approval = match approval_from_submission(payload) {
            Ok(approval) => approval,
            Err(errors) => return Ok(rejected(errors)),
        };
        let state: OpsDialogState = dialog_state(payload)?;
        let reviewer = self.reviewer(payload).await?;

        let details = match self
            .services
            .routes
            .approve_route_request(state.request_id()?, &reviewer, approval, team_id(payload))
            .await?
        {
            Review::Done(approved) => approved.request,
            Review::Blocked(_, current) => *current,
        };
        self.refresh_card(payload, &state.channel_id, &state.time_stamp, &details).await;
        Ok(HandlerOutcome::Handled)
    }
}

/// A review dialog that fails after validation asks operations to try again.
fn unsuccessful(error: HandlerError) -> HandlerError {
    match error {
        HandlerError::Unsuccessful(_) => error,
        other => HandlerError::Unsuccessful(other.to_string()),
    }
}

#[async_trait]
impl InteractionHandler for OperationsRouteHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        match payload.callback_id.as_deref() {
            Some(DECLINED_REQUEST_CALLBACK) => self.declined(payload).await.map_err(unsuccessful),
            Some(APPROVED_REQUEST_CALLBACK) => self.approved(payload).await.map_err(unsuccessful),
            _ if !payload.is_dialog_submission() => self.card_action(payload, respond).await,
            other => Err(unknown_action(other)),
        }
    }
}
