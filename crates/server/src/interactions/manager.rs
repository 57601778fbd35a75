//! A manager approving or declining a trip request from the DM they were sent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tembea_core::domain::ids::TripId;
use tembea_core::validation::validate_reason;
use tembea_core::Trip;
use tembea_slack::dialog::reason_dialog;
use tembea_slack::messages::{
    text_message, trip_info_attachment, SlackInteractiveMessage, COULD_NOT_APPROVE,
    TRIP_ALREADY_CANCELLED,
};
use tembea_slack::{
    HandlerError, HandlerOutcome, InteractionHandler, InteractionPayload, InteractionRouter,
    Responder, RouteKey,
};

use super::{open_dialog, parse, rejected, team_id, unknown_action};
use crate::state::Services;

pub const MANAGER_ACTIONS_CALLBACK: &str = "manager_actions";
pub const MANAGER_APPROVE: &str = "manager_approve";
pub const MANAGER_DECLINE: &str = "manager_decline";
pub const APPROVE_TRIP_CALLBACK: &str = "approve_trip_reason";
pub const DECLINE_TRIP_CALLBACK: &str = "decline_trip";
pub const APPROVE_REASON: &str = "approveReason";
pub const DECLINE_REASON: &str = "declineReason";
pub const COULD_NOT_DECLINE: &str = "This trip request has already been processed.";

pub fn register(router: &mut InteractionRouter, services: &Arc<Services>) {
    router.register(
        RouteKey::callback(MANAGER_ACTIONS_CALLBACK),
        ManagerActionsHandler { services: Arc::clone(services) },
    );
    router.register(
        RouteKey::callback(APPROVE_TRIP_CALLBACK),
        ManagerDecisionHandler { services: Arc::clone(services), approve: true },
    );
    router.register(
        RouteKey::callback(DECLINE_TRIP_CALLBACK),
        ManagerDecisionHandler { services: Arc::clone(services), approve: false },
    );
}

/// Carried by the reason dialog so the manager's DM can be rewritten afterwards. The
/// timestamp and channel are empty when the button did not come from a posted message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionState {
    #[serde(default)]
    time_stamp: String,
    #[serde(default)]
    channel_id: String,
    trip_id: TripId,
}

impl DecisionState {
    fn encode(&self) -> Result<String, HandlerError> {
        serde_json::to_string(self)
            .map_err(|state_error| HandlerError::InvalidPayload(state_error.to_string()))
    }

    fn decode(payload: &InteractionPayload) -> Result<Self, HandlerError> {
        payload.parse_state().map_err(|state_error| {
            HandlerError::InvalidPayload(format!("manager dialog state: {state_error}"))
        })
    }
}

pub struct ManagerActionsHandler {
    services: Arc<Services>,
}

#[async_trait]
impl InteractionHandler for ManagerActionsHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let trip_id: TripId = parse(payload.action_value(), "trip id")?;
        let trip = self.services.trips.get_by_id(trip_id).await?;
        if trip.is_cancelled() {
            respond.respond(text_message(TRIP_ALREADY_CANCELLED)).await?;
            return Ok(HandlerOutcome::Handled);
        }

        let state = DecisionState {
            time_stamp: payload.message_timestamp().unwrap_or_default().to_string(),
            channel_id: payload.channel_id().unwrap_or_default().to_string(),
            trip_id,
        }
        .encode()?;
        let dialog = match payload.action_name() {
            Some(MANAGER_APPROVE) => {
                reason_dialog(APPROVE_TRIP_CALLBACK, &state, "Approval", "Approve", APPROVE_REASON)
            }
            Some(MANAGER_DECLINE) => {
                reason_dialog(DECLINE_TRIP_CALLBACK, &state, "Decline", "Decline", DECLINE_REASON)
            }
            other => return Err(unknown_action(other)),
        };
        open_dialog(&self.services, payload, &dialog).await?;
        Ok(HandlerOutcome::Handled)
    }
}

/// The reason dialog came back: record the decision and tell the requester.
pub struct ManagerDecisionHandler {
    services: Arc<Services>,
    approve: bool,
}

impl ManagerDecisionHandler {
    async fn completion_message(
        &self,
        trip: &Trip,
    ) -> Result<SlackInteractiveMessage, HandlerError> {
        let rider = self.services.repos.user(trip.rider_id).await?;
        let requester = self.services.repos.user(trip.requested_by_id).await?;
        let verdict = if self.approve { "approved" } else { "declined" };
        let mut attachment = trip_info_attachment(trip, &rider, &requester);
        if let Some(comment) = trip.manager_comment.as_deref() {
            attachment = attachment.field("Manager's Reason", comment, false);
        }
        let text = format!("You have {verdict} this trip request");
        Ok(SlackInteractiveMessage::new(text).attachment(attachment))
    }
}

#[async_trait]
impl InteractionHandler for ManagerDecisionHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let field = if self.approve { APPROVE_REASON } else { DECLINE_REASON };
        let reason = payload.submission_value(field).unwrap_or_default();
        let errors = validate_reason(field, &reason);
        if !errors.is_empty() {
            return Ok(rejected(errors));
        }

        let state = DecisionState::decode(payload)?;
        let manager = payload.user.id.as_str();
        let decided = if self.approve {
            self.services.trips.approve_request(state.trip_id, manager, &reason).await?
        } else {
            self.services.trips.decline_trip(state.trip_id, manager, &reason).await?
        };
        let Some(trip) = decided else {
            let reply = if self.approve { COULD_NOT_APPROVE } else { COULD_NOT_DECLINE };
            respond.respond(text_message(reply)).await?;
            return Ok(HandlerOutcome::Handled);
        };

        let team_id = team_id(payload);
        self.services.trips.notify_decision(&trip, manager, team_id, self.approve).await?;
        let completion = self.completion_message(&trip).await?;
        if state.channel_id.is_empty() || state.time_stamp.is_empty() {
            respond.respond(completion).await?;
        } else {
            let notifier = self.services.teams.notifier_for(team_id).await;
            notifier.update(&state.channel_id, &state.time_stamp, &completion).await;
        }
        Ok(HandlerOutcome::Handled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use tembea_core::{TripId, TripStatus};
    use tembea_slack::messages::{COULD_NOT_APPROVE, TRIP_ALREADY_CANCELLED};
    use tembea_slack::payload::{OriginalMessage, PayloadChannel};
    use tembea_slack::respond::RecordingResponder;
    use tembea_slack::DispatchOutcome;

    use super::DecisionState;
    use crate::interactions::test_support::{button, harness, submission};
    use crate::jobs::test_support::trip;
    use crate::services::test_support::user;

    fn decision_state(time_stamp: &str, channel_id: &str, trip_id: TripId) -> String {
        DecisionState {
            time_stamp: time_stamp.to_string(),
            channel_id: channel_id.to_string(),
            trip_id,
        }
        .encode()
        .expect("encode")
    }

    #[test]
    fn decision_state_keeps_empty_message_coordinates() {
        let state = decision_state("", "", TripId(7));
        let mut payload = submission("approve_trip_reason", "UMANAGER", &state, json!({}));

        let state = DecisionState::decode(&payload).expect("decode");

        assert_eq!(state.trip_id, TripId(7));
        assert!(state.channel_id.is_empty());
        assert!(state.time_stamp.is_empty());

        payload.state = Some("1.1 DMANAGER 7".to_string());
        assert!(DecisionState::decode(&payload).is_err());
    }

    #[tokio::test]
    async fn cancelled_trips_cannot_be_reviewed() {
        let harness = harness().await;
        let tomorrow = Utc::now() + Duration::days(1);
        let cancelled = trip(&harness.services.repos, TripStatus::Cancelled, tomorrow).await;
        let respond = RecordingResponder::new();

        harness
            .router
            .dispatch(
                &button(
                    "manager_actions",
                    "UMANAGER",
                    "manager_approve",
                    &cancelled.id.to_string(),
                ),
                &respond,
            )
            .await
            .expect("dispatch");

        assert_eq!(respond.texts().await, vec![TRIP_ALREADY_CANCELLED.to_string()]);
        assert!(harness.api.opened_dialogs().await.is_empty());
    }

    #[tokio::test]
    async fn approve_button_opens_the_reason_dialog() {
        let harness = harness().await;
        let tomorrow = Utc::now() + Duration::days(1);
        let pending = trip(&harness.services.repos, TripStatus::Pending, tomorrow).await;
        let mut payload =
            button("manager_actions", "UMANAGER", "manager_approve", &pending.id.to_string());
        payload.channel = Some(PayloadChannel { id: "DMANAGER".to_string(), name: None });
        payload.original_message = Some(OriginalMessage { ts: Some("1554291432.001".to_string()) });

        harness.router.dispatch(&payload, &RecordingResponder::new()).await.expect("dispatch");

        let dialogs = harness.api.opened_dialogs().await;
        assert_eq!(dialogs[0].callback_id, "approve_trip_reason");
        assert_eq!(
            dialogs[0].state.as_deref(),
            Some(decision_state("1554291432.001", "DMANAGER", pending.id).as_str())
        );
    }

    #[tokio::test]
    async fn blank_reason_is_sent_back_to_the_dialog() {
        let harness = harness().await;

        let outcome = harness
            .router
            .dispatch(
                &submission(
                    "decline_trip",
                    "UMANAGER",
                    &decision_state("1.1", "DMANAGER", TripId(1)),
                    json!({ "declineReason": "   " }),
                ),
                &RecordingResponder::new(),
            )
            .await
            .expect("dispatch");

        let DispatchOutcome::ValidationErrors(errors) = outcome else {
            panic!("expected validation errors, got {outcome:?}");
        };
        assert_eq!(errors[0].name, "declineReason");
    }

    #[tokio::test]
    async fn approval_notifies_the_requester_once() {
        let harness = harness().await;
        let repos = harness.services.repos.clone();
        user(&repos, "UMANAGER", "manager@andela.com").await;
        let pending = trip(&repos, TripStatus::Pending, Utc::now() + Duration::days(1)).await;
        let state = decision_state("1554291432.001", "DMANAGER", pending.id);
        let approve = submission(
            "approve_trip_reason",
            "UMANAGER",
            &state,
            json!({ "approveReason": "Client visit" }),
        );

        let respond = RecordingResponder::new();
        harness.router.dispatch(&approve, &respond).await.expect("dispatch");

        let stored = repos.trips.find_by_id(pending.id).await.expect("find").expect("trip");
        assert_eq!(stored.status, TripStatus::Approved);
        assert_eq!(harness.api.posted_messages().await[0].0, "DURIDER");
        assert_eq!(
            harness.api.updated_messages().await[0].text,
            "You have approved this trip request"
        );

        harness.router.dispatch(&approve, &respond).await.expect("dispatch again");
        assert_eq!(respond.texts().await, vec![COULD_NOT_APPROVE.to_string()]);
    }

    #[tokio::test]
    async fn decision_without_a_posted_message_is_answered_in_place() {
        let harness = harness().await;
        let repos = harness.services.repos.clone();
        user(&repos, "UMANAGER", "manager@andela.com").await;
        let pending = trip(&repos, TripStatus::Pending, Utc::now() + Duration::days(1)).await;

        harness
            .router
            .dispatch(
                &button("manager_actions", "UMANAGER", "manager_decline", &pending.id.to_string()),
                &RecordingResponder::new(),
            )
            .await
            .expect("dispatch button");
        let state = harness.api.opened_dialogs().await[0].state.clone().expect("state");

        let respond = RecordingResponder::new();
        let outcome = harness
            .router
            .dispatch(
                &submission(
                    "decline_trip",
                    "UMANAGER",
                    &state,
                    json!({ "declineReason": "No budget" }),
                ),
                &respond,
            )
            .await
            .expect("dispatch decision");

        assert!(matches!(outcome, DispatchOutcome::Handled));
        let stored = repos.trips.find_by_id(pending.id).await.expect("find").expect("trip");
        assert_eq!(stored.status, TripStatus::DeclinedByManager);
        assert_eq!(respond.texts().await, vec!["You have declined this trip request".to_string()]);
        assert!(harness.api.updated_messages().await.is_empty());
    }
}
