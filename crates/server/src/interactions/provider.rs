//! Providers staffing trips and route batches, and replacing deleted cabs or drivers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tembea_core::domain::ids::{CabId, DriverId, ProviderId, RouteBatchId, TripId};
use tembea_core::domain::route::RouteBatchChanges;
use tembea_core::validation::FieldError;
use tembea_core::{PageRequest, Provider};
use tembea_slack::dialog::{cab_and_driver_dialog, DialogOption};
use tembea_slack::messages::{
    text_message, SlackInteractiveMessage, ASSIGNED_TO_ANOTHER_PROVIDER, TRIP_ALREADY_CANCELLED,
};
use tembea_slack::notifications::provider::{
    route_completion_update, trip_completion_update, ASSIGN_CAB, CAB_UPDATE_COMPLETE,
    DRIVER_UPDATE_COMPLETE, PROVIDER_APPROVAL, PROVIDER_ROUTE_CALLBACK, PROVIDER_TRIP_CALLBACK,
    REASSIGN_CAB_CALLBACK, REASSIGN_DRIVER_CALLBACK,
};
use tembea_slack::{
    HandlerError, HandlerOutcome, InteractionHandler, InteractionPayload, InteractionRouter,
    Responder, RouteKey,
};

use super::{dialog_state, open_dialog, parse, rejected, team_id, unknown_action};
use crate::state::Services;

pub const TRIP_APPROVAL_CALLBACK: &str = "providers_approval_trip";
pub const ROUTE_APPROVAL_CALLBACK: &str = "providers_approval_route";
pub const NOT_A_PROVIDER: &str = "You are not registered as a provider";

const FLEET_OPTIONS: u32 = 100;

pub fn register(router: &mut InteractionRouter, services: &Arc<Services>) {
    let handler = || ProviderHandler { services: Arc::clone(services) };
    router.register(RouteKey::callback(PROVIDER_TRIP_CALLBACK), handler());
    router.register(RouteKey::callback(PROVIDER_ROUTE_CALLBACK), handler());
    router.register(RouteKey::callback(TRIP_APPROVAL_CALLBACK), handler());
    router.register(RouteKey::callback(ROUTE_APPROVAL_CALLBACK), handler());
    router.register(RouteKey::callback(REASSIGN_DRIVER_CALLBACK), handler());
    router.register(RouteKey::callback(REASSIGN_CAB_CALLBACK), handler());
}

/// State of the cab and driver dialog. `target` is the trip or batch id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentState {
    pub target: String,
    pub provider_id: String,
    pub channel_id: String,
    pub time_stamp: String,
}

pub struct ProviderHandler {
    services: Arc<Services>,
}

impl ProviderHandler {
    async fn acting_provider(
        &self,
        payload: &InteractionPayload,
    ) -> Result<Option<Provider>, HandlerError> {
        let providers = &self.services.providers;
        Ok(providers.get_provider_by_slack_id(&payload.user.id).await?)
    }

    async fn open_assignment_dialog(
        &self,
        payload: &InteractionPayload,
        callback_id: &str,
        provider: &Provider,
    ) -> Result<(), HandlerError> {
        let page = PageRequest::new(Some(1), Some(FLEET_OPTIONS));
        let cabs = self.services.cabs.get_cabs(Some(provider.id), page).await?;
        let drivers = self.services.drivers.get_drivers(Some(provider.id), page).await?;
        let state = AssignmentState {
            target: payload.action_value().unwrap_or_default().to_string(),
            provider_id: provider.id.to_string(),
            channel_id: payload.channel_id().unwrap_or_default().to_string(),
            time_stamp: payload.message_timestamp().unwrap_or_default().to_string(),
        };
        let state = serde_json::to_string(&state)
            .map_err(|encode_error| HandlerError::InvalidPayload(encode_error.to_string()))?;

        let cab_options = cabs
            .items
            .iter()
            .map(|cab| {
                let label = format!("{} - {}", cab.model, cab.reg_number);
                DialogOption::new(label, cab.id.to_string())
            })
            .collect();
        let driver_options = drivers
            .items
            .iter()
            .map(|driver| {
                let label = format!("{} - {}", driver.driver_name, driver.driver_phone_no);
                DialogOption::new(label, driver.id.to_string())
            })
            .collect();
        let dialog = cab_and_driver_dialog(callback_id, &state, cab_options, driver_options);
        open_dialog(&self.services, payload, &dialog).await
    }

    /// Replaces the provider's message, or replies when it cannot be located.
    async fn replace_message(
        &self,
        payload: &InteractionPayload,
        state: &AssignmentState,
        message: SlackInteractiveMessage,
        respond: &dyn Responder,
    ) -> Result<(), HandlerError> {
        if state.channel_id.is_empty() || state.time_stamp.is_empty() {
            respond.respond(message).await?;
        } else {
            let notifier = self.services.teams.notifier_for(team_id(payload)).await;
            notifier.update(&state.channel_id, &state.time_stamp, &message).await;
        }
        Ok(())
    }

    async fn assign_trip(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        if payload.action_name() != Some(ASSIGN_CAB) {
            return Err(unknown_action(payload.action_name()));
        }
        let trip_id: TripId = parse(payload.action_value(), "trip id")?;
        let trip = self.services.trips.get_by_id(trip_id).await?;
        if trip.is_cancelled() {
            respond.respond(text_message(TRIP_ALREADY_CANCELLED)).await?;
            return Ok(HandlerOutcome::Handled);
        }
        match self.acting_provider(payload).await? {
            Some(provider) if trip.provider_id == Some(provider.id) => {
                self.open_assignment_dialog(payload, TRIP_APPROVAL_CALLBACK, &provider).await?;
            }
            _ => respond.respond(text_message(ASSIGNED_TO_ANOTHER_PROVIDER)).await?,
        }
        Ok(HandlerOutcome::Handled)
    }

    async fn assign_route(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        if payload.action_name() != Some(PROVIDER_APPROVAL) {
            return Err(unknown_action(payload.action_name()));
        }
        let Some(provider) = self.acting_provider(payload).await? else {
            respond.respond(text_message(NOT_A_PROVIDER)).await?;
            return Ok(HandlerOutcome::Handled);
        };
        let batch_id: RouteBatchId = parse(payload.action_value(), "route batch id")?;
        self.services.routes.get_route_batch_by_pk(batch_id).await?;
        self.open_assignment_dialog(payload, ROUTE_APPROVAL_CALLBACK, &provider).await?;
        Ok(HandlerOutcome::Handled)
    }

    async fn trip_assigned(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let (cab_id, driver_id) = match selected_fleet(payload) {
            Ok(selected) => selected,
            Err(errors) => return Ok(rejected(errors)),
        };
        let state: AssignmentState = dialog_state(payload)?;
        let trip_id: TripId = parse(Some(state.target.as_str()), "trip id")?;
        let provider_id: ProviderId = parse(Some(state.provider_id.as_str()), "provider id")?;

        let trip = self
            .services
            .trips
            .complete_trip(trip_id, cab_id, driver_id, provider_id)
            .await?;
        let provider = self.services.providers.find_by_pk(provider_id).await?;
        let cab = self.services.cabs.get_cab_by_id(cab_id).await?;
        let driver = self.services.drivers.get_driver_by_id(driver_id).await?;
        let rider = self.services.repos.user(trip.rider_id).await?;
        let requester = self.services.repos.user(trip.requested_by_id).await?;

        let update = trip_completion_update(&provider, &trip, &rider, &requester, &cab, &driver);
        self.replace_message(payload, &state, update, respond).await?;
        Ok(HandlerOutcome::Handled)
    }

    async fn route_assigned(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let (cab_id, driver_id) = match selected_fleet(payload) {
            Ok(selected) => selected,
            Err(errors) => return Ok(rejected(errors)),
        };
        let state: AssignmentState = dialog_state(payload)?;
        let batch_id: RouteBatchId = parse(Some(state.target.as_str()), "route batch id")?;

        let changes = RouteBatchChanges {
            cab_id: Some(cab_id),
            driver_id: Some(driver_id),
            ..RouteBatchChanges::default()
        };
        let update = self
            .services
            .routes
            .update_route_batch(batch_id, changes, team_id(payload))
            .await?;
        let details = &update.details;
        let (Some(cab), Some(driver)) = (details.cab.as_ref(), details.driver.as_ref()) else {
            return Err(HandlerError::Unsuccessful(format!(
                "route batch {batch_id} has no cab or driver"
            )));
        };
        let message = route_completion_update(&update.details, cab, driver);
        self.replace_message(payload, &state, message, respond).await?;
        Ok(HandlerOutcome::Handled)
    }

    /// Select menus on the reassignment message: the action name is the batch id and
    /// the selected option is the replacement.
    async fn reassign(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
        driver: bool,
    ) -> Result<HandlerOutcome, HandlerError> {
        let batch_id: RouteBatchId = parse(payload.action_name(), "route batch id")?;
        let changes = if driver {
            let driver_id: DriverId = parse(payload.action_value(), "driver id")?;
            RouteBatchChanges { driver_id: Some(driver_id), ..RouteBatchChanges::default() }
        } else {
            let cab_id: CabId = parse(payload.action_value(), "cab id")?;
            RouteBatchChanges { cab_id: Some(cab_id), ..RouteBatchChanges::default() }
        };
        self.services
            .routes
            .update_route_batch(batch_id, changes, team_id(payload))
            .await?;
        let reply = if driver { DRIVER_UPDATE_COMPLETE } else { CAB_UPDATE_COMPLETE };
        respond.respond(text_message(reply)).await?;
        Ok(HandlerOutcome::Handled)
    }
}

fn selected_fleet(payload: &InteractionPayload) -> Result<(CabId, DriverId), Vec<FieldError>> {
    let cab = payload.submission_value("cab").and_then(|value| value.parse::<CabId>().ok());
    let driver = payload
        .submission_value("driver")
        .and_then(|value| value.parse::<DriverId>().ok());
    match (cab, driver) {
        (Some(cab), Some(driver)) => Ok((cab, driver)),
        (cab, driver) => {
            let mut errors = Vec::new();
            if driver.is_none() {
                errors.push(FieldError::new("driver", "Please select a driver"));
            }
            if cab.is_none() {
                errors.push(FieldError::new("cab", "Please select a cab"));
            }
            Err(errors)
        }
    }
}

#[async_trait]
impl InteractionHandler for ProviderHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        match payload.callback_id.as_deref().unwrap_or_default() {
            PROVIDER_TRIP_CALLBACK => self.assign_trip(payload, respond).await,
            PROVIDER_ROUTE_CALLBACK => self.assign_route(payload, respond).await,
            TRIP_APPROVAL_CALLBACK => self.trip_assigned(payload, respond).await,
            ROUTE_APPROVAL_CALLBACK => self.route_assigned(payload, respond).await,
            REASSIGN_DRIVER_CALLBACK => self.reassign(payload, respond, true).await,
            REASSIGN_CAB_CALLBACK => self.reassign(payload, respond, false).await,
            other => Err(HandlerError::UnknownAction(other.to_string())),
        }
    }
}
