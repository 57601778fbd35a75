//! A rider answering "did you take the route today?".

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tembea_core::domain::ids::BatchUseRecordId;
use tembea_core::domain::usage::{AttendStatus, BatchUseRecord};
use tembea_core::errors::ServiceError;
use tembea_core::validation::validate_reason;
use tembea_slack::dialog::reason_dialog;
use tembea_slack::messages::text_message;
use tembea_slack::notifications::route::{
    CONFIRM_ROUTE_USE_CALLBACK, ROUTE_NOT_TAKEN, ROUTE_STILL_ON_TRIP, ROUTE_TAKEN,
};
use tembea_slack::{
    HandlerError, HandlerOutcome, InteractionHandler, InteractionPayload, InteractionRouter,
    Responder, RouteKey,
};

use super::{open_dialog, parse, rejected, unknown_action};
use crate::state::Services;

pub const ROUTE_SKIPPED_CALLBACK: &str = "route_skipped";
pub const SKIP_REASON: &str = "reason";
pub const ROUTE_TAKEN_REPLY: &str =
    "Great! Thank you for confirming that you took the route. :smiley:";
pub const STILL_ON_TRIP_REPLY: &str =
    "Noted. We will check in with you again once the trip is over.";
pub const SKIP_RECORDED_REPLY: &str = "Thank you for letting us know why you missed the route.";

pub fn register(router: &mut InteractionRouter, services: &Arc<Services>) {
    router.register(
        RouteKey::callback(CONFIRM_ROUTE_USE_CALLBACK),
        RouteUseHandler { services: Arc::clone(services) },
    );
    router.register(
        RouteKey::callback(ROUTE_SKIPPED_CALLBACK),
        RouteSkippedHandler { services: Arc::clone(services) },
    );
}

async fn pending_record(
    services: &Services,
    record_id: BatchUseRecordId,
) -> Result<BatchUseRecord, HandlerError> {
    services
        .repos
        .batch_use
        .find_by_id(record_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ServiceError::not_found("Route use record not found").into())
}

/// Yes / still on trip / no buttons from the route use prompt.
pub struct RouteUseHandler {
    services: Arc<Services>,
}

#[async_trait]
impl InteractionHandler for RouteUseHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let record_id: BatchUseRecordId = parse(payload.action_value(), "route use record id")?;
        let record = pending_record(&self.services, record_id).await?;
        let batch_use = &self.services.repos.batch_use;

        match payload.action_name() {
            Some(ROUTE_TAKEN) => {
                batch_use
                    .update_status(record.id, AttendStatus::Confirmed, None)
                    .await
                    .map_err(ServiceError::from)?;
                info!(
                    event_name = "routes.use.confirmed",
                    record_id = %record.id,
                    "rider took the route"
                );
                respond.respond(text_message(ROUTE_TAKEN_REPLY)).await?;
            }
            Some(ROUTE_NOT_TAKEN) => {
                batch_use
                    .update_status(record.id, AttendStatus::Skip, None)
                    .await
                    .map_err(ServiceError::from)?;
                let dialog = reason_dialog(
                    ROUTE_SKIPPED_CALLBACK,
                    &record.id.to_string(),
                    "Skipped Trip",
                    "Submit",
                    SKIP_REASON,
                );
                open_dialog(&self.services, payload, &dialog).await?;
            }
            Some(ROUTE_STILL_ON_TRIP) => {
                let fire_at = self.services.route_use.schedule_recheck(record.id);
                info!(
                    event_name = "routes.use.recheck_scheduled",
                    record_id = %record.id,
                    %fire_at,
                    "rider still on trip"
                );
                respond.respond(text_message(STILL_ON_TRIP_REPLY)).await?;
            }
            other => return Err(unknown_action(other)),
        }
        Ok(HandlerOutcome::Handled)
    }
}

/// Reason a rider gives for skipping the route.
pub struct RouteSkippedHandler {
    services: Arc<Services>,
}

#[async_trait]
impl InteractionHandler for RouteSkippedHandler {
    async fn handle(
        &self,
        payload: &InteractionPayload,
        respond: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        let reason = payload.submission_value(SKIP_REASON).unwrap_or_default();
        let errors = validate_reason(SKIP_REASON, &reason);
        if !errors.is_empty() {
            return Ok(rejected(errors));
        }

        let record_id: BatchUseRecordId = parse(payload.state.as_deref(), "route use record id")?;
        let record = pending_record(&self.services, record_id).await?;
        self.services
            .repos
            .batch_use
            .update_status(record.id, AttendStatus::Skip, Some(reason.trim().to_string()))
            .await
            .map_err(ServiceError::from)?;
        respond.respond(text_message(SKIP_RECORDED_REPLY)).await?;
        Ok(HandlerOutcome::Handled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use tembea_core::domain::usage::{AttendStatus, BatchUseRecord, NewBatchUseRecord};
    use tembea_slack::respond::RecordingResponder;
    use tembea_slack::DispatchOutcome;

    use super::{SKIP_RECORDED_REPLY, STILL_ON_TRIP_REPLY};
    use crate::interactions::test_support::{button, harness, submission};
    use crate::jobs::route_use::recheck_job_name;
    use crate::services::Repositories;
    use crate::services::test_support::{rider_on, route_batch};

    async fn pending(repos: &Repositories) -> BatchUseRecord {
        let batch = route_batch(repos).await;
        let rider = rider_on(repos, &batch, "URIDER", "rider@andela.com").await;
        repos
            .batch_use
            .record(
                NewBatchUseRecord {
                    user_id: rider.id,
                    batch_id: batch.id,
                    batch_date: Utc::now().date_naive(),
                },
                AttendStatus::Pending,
            )
            .await
            .expect("record")
    }

    async fn status(repos: &Repositories, record: &BatchUseRecord) -> BatchUseRecord {
        repos.batch_use.find_by_id(record.id).await.expect("find").expect("record")
    }

    #[tokio::test]
    async fn taking_the_route_confirms_the_record() {
        let harness = harness().await;
        let record = pending(&harness.services.repos).await;
        let respond = RecordingResponder::new();

        harness
            .router
            .dispatch(
                &button("confirm_route_use", "URIDER", "taken", &record.id.to_string()),
                &respond,
            )
            .await
            .expect("dispatch");

        let stored = status(&harness.services.repos, &record).await;
        assert_eq!(stored.user_attend_status, AttendStatus::Confirmed);
        assert_eq!(respond.texts().await.len(), 1);
    }

    #[tokio::test]
    async fn skipping_asks_why_and_stores_the_reason() {
        let harness = harness().await;
        let record = pending(&harness.services.repos).await;

        harness
            .router
            .dispatch(
                &button("confirm_route_use", "URIDER", "not_taken", &record.id.to_string()),
                &RecordingResponder::new(),
            )
            .await
            .expect("dispatch");

        let stored = status(&harness.services.repos, &record).await;
        assert_eq!(stored.user_attend_status, AttendStatus::Skip);
        let dialogs = harness.api.opened_dialogs().await;
        assert_eq!(dialogs[0].callback_id, "route_skipped");
        assert_eq!(dialogs[0].state.as_deref(), Some(record.id.to_string().as_str()));

        let respond = RecordingResponder::new();
        harness
            .router
            .dispatch(
                &submission(
                    "route_skipped",
                    "URIDER",
                    &record.id.to_string(),
                    json!({ "reason": " Worked from home " }),
                ),
                &respond,
            )
            .await
            .expect("dispatch reason");

        let stored = status(&harness.services.repos, &record).await;
        assert_eq!(stored.reason.as_deref(), Some("Worked from home"));
        assert_eq!(respond.texts().await, vec![SKIP_RECORDED_REPLY.to_string()]);
    }

    #[tokio::test]
    async fn blank_skip_reason_is_rejected() {
        let harness = harness().await;
        let record = pending(&harness.services.repos).await;

        let outcome = harness
            .router
            .dispatch(
                &submission(
                    "route_skipped",
                    "URIDER",
                    &record.id.to_string(),
                    json!({ "reason": "" }),
                ),
                &RecordingResponder::new(),
            )
            .await
            .expect("dispatch");

        assert!(matches!(outcome, DispatchOutcome::ValidationErrors(_)));
        let stored = status(&harness.services.repos, &record).await;
        assert_eq!(stored.user_attend_status, AttendStatus::Pending);
    }

    #[tokio::test]
    async fn still_on_trip_schedules_another_prompt() {
        let harness = harness().await;
        let record = pending(&harness.services.repos).await;
        let respond = RecordingResponder::new();

        harness
            .router
            .dispatch(
                &button("confirm_route_use", "URIDER", "still_on_trip", &record.id.to_string()),
                &respond,
            )
            .await
            .expect("dispatch");

        assert!(harness.scheduler.is_scheduled(&recheck_job_name(record.id)));
        assert_eq!(respond.texts().await, vec![STILL_ON_TRIP_REPLY.to_string()]);
        let stored = status(&harness.services.repos, &record).await;
        assert_eq!(stored.user_attend_status, AttendStatus::Pending);
        harness.scheduler.shutdown();
    }
}
