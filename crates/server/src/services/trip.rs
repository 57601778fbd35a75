use chrono::{DateTime, Utc};
use tracing::info;

use tembea_core::domain::ids::{CabId, DriverId, ProviderId, TripId};
use tembea_core::domain::trip::NewTrip;
use tembea_core::errors::ServiceError;
use tembea_core::{Trip, TripStatus, User};
use tembea_slack::Delivery;

use super::{Repositories, TeamDetailsService};
use crate::jobs::{trip_completion, trip_reminder, JobScheduler, TripCompletionJob, TripReminderJob};

pub const TRIP_NOT_FOUND: &str = "Trip not found";

#[derive(Clone, Debug, PartialEq)]
pub enum Cancellation {
    Cancelled(Trip),
    AlreadyCancelled(Trip),
}

#[derive(Clone)]
pub struct TripService {
    repos: Repositories,
    teams: TeamDetailsService,
    scheduler: JobScheduler,
    reminders: TripReminderJob,
    completions: TripCompletionJob,
}

impl TripService {
    pub fn new(
        repos: Repositories,
        teams: TeamDetailsService,
        scheduler: JobScheduler,
        reminders: TripReminderJob,
        completions: TripCompletionJob,
    ) -> Self {
        Self { repos, teams, scheduler, reminders, completions }
    }

    pub async fn get_by_id(&self, id: TripId) -> Result<Trip, ServiceError> {
        self.repos
            .trips
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TRIP_NOT_FOUND))
    }

    /// Stores the request and queues the completion prompt.
    pub async fn create_trip(&self, trip: NewTrip) -> Result<Trip, ServiceError> {
        let trip = self.repos.trips.create(trip).await?;
        self.completions.create_schedule_for_trip(&trip);
        info!(event_name = "trips.created", trip_id = trip.id.0, "trip request stored");
        Ok(trip)
    }

    pub async fn update_trip(&self, trip: &Trip) -> Result<(), ServiceError> {
        Ok(self.repos.trips.update(trip).await?)
    }

    /// `None` when the trip is no longer waiting for its manager.
    pub async fn approve_request(
        &self,
        trip_id: TripId,
        manager_slack_id: &str,
        reason: &str,
    ) -> Result<Option<Trip>, ServiceError> {
        let manager = self.manager(manager_slack_id).await?;
        let mut trip = self.get_by_id(trip_id).await?;
        if !trip.approve(manager.id, reason.trim()) {
            return Ok(None);
        }
        self.update_trip(&trip).await?;
        Ok(Some(trip))
    }

    /// `None` when the trip is no longer waiting for its manager.
    pub async fn decline_trip(
        &self,
        trip_id: TripId,
        manager_slack_id: &str,
        reason: &str,
    ) -> Result<Option<Trip>, ServiceError> {
        let manager = self.manager(manager_slack_id).await?;
        let mut trip = self.get_by_id(trip_id).await?;
        if !trip.decline(manager.id, reason.trim()) {
            return Ok(None);
        }
        self.update_trip(&trip).await?;
        Ok(Some(trip))
    }

    /// DMs the requester the manager's decision.
    pub async fn notify_decision(
        &self,
        trip: &Trip,
        manager_slack_id: &str,
        team_id: Option<&str>,
        approved: bool,
    ) -> Result<Delivery, ServiceError> {
        let rider = self.repos.user(trip.rider_id).await?;
        let requester = self.repos.user(trip.requested_by_id).await?;
        let manager = self.manager(manager_slack_id).await?;
        let notifier = self.teams.notifier_for(team_id).await;
        Ok(notifier.send_trip_decision(trip, &rider, &requester, &manager, approved).await)
    }

    pub async fn get_all(
        &self,
        statuses: &[TripStatus],
        departing_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trip>, ServiceError> {
        Ok(self.repos.trips.list(statuses, departing_after).await?)
    }

    /// Cancelling also drops the trip's pending reminder and completion prompt.
    pub async fn cancel_trip(&self, trip_id: TripId) -> Result<Cancellation, ServiceError> {
        let mut trip = self.get_by_id(trip_id).await?;
        if trip.is_cancelled() {
            return Ok(Cancellation::AlreadyCancelled(trip));
        }
        trip.status = TripStatus::Cancelled;
        self.update_trip(&trip).await?;
        self.scheduler.cancel(&trip_reminder::job_name(trip_id));
        self.scheduler.cancel(&trip_completion::job_name(trip_id));
        Ok(Cancellation::Cancelled(trip))
    }

    /// The provider assigned a cab and driver: the trip is confirmed and the rider
    /// gets a reminder before departure.
    pub async fn complete_trip(
        &self,
        trip_id: TripId,
        cab_id: CabId,
        driver_id: DriverId,
        provider_id: ProviderId,
    ) -> Result<Trip, ServiceError> {
        let mut trip = self.get_by_id(trip_id).await?;
        if trip.is_cancelled() {
            return Err(ServiceError::conflict("The trip request has already been cancelled."));
        }
        trip.cab_id = Some(cab_id);
        trip.driver_id = Some(driver_id);
        trip.provider_id = Some(provider_id);
        trip.status = TripStatus::Confirmed;
        self.update_trip(&trip).await?;
        self.reminders.schedule(&trip);
        Ok(trip)
    }

    async fn manager(&self, slack_id: &str) -> Result<User, ServiceError> {
        self.repos
            .users
            .find_by_slack_id(slack_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use secrecy::SecretString;

    use tembea_core::TripStatus;
    use tembea_slack::client::RecordingSlackApi;

    use super::{Cancellation, TripService};
    use crate::jobs::test_support::{context, trip};
    use crate::jobs::{trip_reminder, TripCompletionJob, TripReminderJob};
    use crate::services::test_support::user;
    use crate::services::TeamDetailsService;

    pub(crate) async fn service() -> (TripService, Arc<RecordingSlackApi>) {
        let (ctx, _) = context().await;
        let api = Arc::new(RecordingSlackApi::new());
        let default_token = SecretString::from("xoxb-default".to_string());
        let teams = TeamDetailsService::new(ctx.repos.clone(), api.clone(), default_token);
        let service = TripService::new(
            ctx.repos.clone(),
            teams,
            ctx.scheduler.clone(),
            TripReminderJob::new(ctx.clone()),
            TripCompletionJob::new(ctx),
        );
        (service, api)
    }

    #[tokio::test]
    async fn only_pending_trips_can_be_approved() {
        let (service, api) = service().await;
        user(&service.repos, "UMANAGER", "manager@andela.com").await;
        let tomorrow = Utc::now() + Duration::days(1);
        let pending = trip(&service.repos, TripStatus::Pending, tomorrow).await;

        let approved = service
            .approve_request(pending.id, "UMANAGER", "  Client visit ")
            .await
            .expect("approve");
        let approved = approved.expect("approvable");
        assert_eq!(approved.status, TripStatus::Approved);
        assert_eq!(approved.manager_comment.as_deref(), Some("Client visit"));

        let again = service
            .decline_trip(pending.id, "UMANAGER", "Too late")
            .await
            .expect("decline");
        assert!(again.is_none());
        let stored = service.get_by_id(pending.id).await.expect("stored");
        assert_eq!(stored.status, TripStatus::Approved);

        let delivery = service
            .notify_decision(&approved, "UMANAGER", None, true)
            .await
            .expect("notify");
        assert!(delivery.is_sent());
        assert_eq!(api.posted_messages().await[0].0, "DURIDER");
    }

    #[tokio::test]
    async fn cancelling_twice_reports_already_cancelled() {
        let (service, _api) = service().await;
        let tomorrow = Utc::now() + Duration::days(1);
        let confirmed = trip(&service.repos, TripStatus::Confirmed, tomorrow).await;
        assert!(service.reminders.schedule(&confirmed));

        let first = service.cancel_trip(confirmed.id).await.expect("cancel");
        assert!(matches!(first, Cancellation::Cancelled(_)));
        assert!(!service.scheduler.is_scheduled(&trip_reminder::job_name(confirmed.id)));

        let second = service.cancel_trip(confirmed.id).await.expect("cancel again");
        assert!(matches!(second, Cancellation::AlreadyCancelled(_)));
    }

    #[tokio::test]
    async fn trips_are_listed_by_status_and_departure() {
        let (service, _api) = service().await;
        let now = Utc::now();
        let soon = trip(&service.repos, TripStatus::Confirmed, now + Duration::hours(2)).await;
        let later = trip(&service.repos, TripStatus::Pending, now + Duration::days(2)).await;
        trip(&service.repos, TripStatus::Completed, now + Duration::days(2)).await;

        let open = service
            .get_all(&[TripStatus::Confirmed, TripStatus::Pending], None)
            .await
            .expect("open");
        let mut ids: Vec<_> = open.iter().map(|listed| listed.id).collect();
        ids.sort();
        assert_eq!(ids, vec![soon.id, later.id]);

        let tomorrow = service
            .get_all(&[TripStatus::Confirmed, TripStatus::Pending], Some(now + Duration::days(1)))
            .await
            .expect("after tomorrow");
        assert_eq!(tomorrow.iter().map(|listed| listed.id).collect::<Vec<_>>(), vec![later.id]);
    }

    #[tokio::test]
    async fn missing_trip_is_not_found() {
        let (service, _api) = service().await;

        let error = service.get_by_id(tembea_core::TripId(999)).await.expect_err("missing");

        assert_eq!(error.to_string(), super::TRIP_NOT_FOUND);
    }
}
