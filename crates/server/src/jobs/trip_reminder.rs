use chrono::{Duration, Utc};

use tembea_core::domain::ids::TripId;
use tembea_core::errors::ServiceError;
use tembea_core::{Trip, TripStatus};

use super::{capture, JobContext};

/// Reminds the rider of a confirmed trip shortly before departure.
#[derive(Clone)]
pub struct TripReminderJob {
    ctx: JobContext,
}

pub fn job_name(trip_id: TripId) -> String {
    format!("trip-reminder-{}", trip_id.0)
}

impl TripReminderJob {
    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    /// Returns false when the reminder time has already passed.
    pub fn schedule(&self, trip: &Trip) -> bool {
        let lead = Duration::minutes(self.ctx.settings.reminder_lead_minutes);
        let fire_at = trip.departure_time - lead;
        if fire_at <= Utc::now() {
            return false;
        }
        let job = self.clone();
        let trip_id = trip.id;
        self.ctx.scheduler.schedule_at(job_name(trip_id), fire_at, move || async move {
            capture("trip_reminder", job.remind(trip_id).await.map(|_| ()));
        });
        true
    }

    /// Sends the reminder when the trip is still confirmed. Returns whether it went out.
    pub async fn remind(&self, trip_id: TripId) -> Result<bool, ServiceError> {
        let Some(trip) = self.ctx.repos.trips.find_by_id(trip_id).await? else {
            return Ok(false);
        };
        if trip.status != TripStatus::Confirmed {
            return Ok(false);
        }
        let rider = self.ctx.repos.user(trip.rider_id).await?;
        Ok(self.ctx.notifier.send_trip_reminder(&trip, &rider).await.is_sent())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use tembea_core::TripStatus;

    use super::{job_name, TripReminderJob};
    use crate::jobs::test_support::{context, trip};

    #[tokio::test]
    async fn reminder_is_scheduled_ahead_of_departure() {
        let (ctx, api) = context().await;
        let departure = Utc::now() + Duration::hours(3);
        let trip = trip(&ctx.repos, TripStatus::Confirmed, departure).await;
        let job = TripReminderJob::new(ctx.clone());

        assert!(job.schedule(&trip));

        let fire_at = ctx.scheduler.fire_time(&job_name(trip.id)).expect("scheduled");
        assert_eq!(fire_at, departure - Duration::minutes(60));
        assert!(api.posted_messages().await.is_empty());
        ctx.scheduler.shutdown();
    }

    #[tokio::test]
    async fn only_confirmed_trips_are_reminded() {
        let (ctx, api) = context().await;
        let departure = Utc::now() + Duration::hours(1);
        let confirmed = trip(&ctx.repos, TripStatus::Confirmed, departure).await;
        let cancelled = trip(&ctx.repos, TripStatus::Cancelled, departure).await;
        let job = TripReminderJob::new(ctx);

        assert!(job.remind(confirmed.id).await.expect("confirmed"));
        assert!(!job.remind(cancelled.id).await.expect("cancelled"));
        assert_eq!(api.posted_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn past_reminders_are_not_scheduled() {
        let (ctx, _api) = context().await;
        let soon = trip(&ctx.repos, TripStatus::Confirmed, Utc::now() + Duration::minutes(5)).await;

        assert!(!TripReminderJob::new(ctx.clone()).schedule(&soon));
        assert_eq!(ctx.scheduler.count(), 0);
    }
}
