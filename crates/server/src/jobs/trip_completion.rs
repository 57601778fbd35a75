use chrono::{DateTime, Duration, Utc};
use tracing::info;

use tembea_core::domain::ids::TripId;
use tembea_core::errors::ServiceError;
use tembea_core::{Trip, TripStatus};

use super::{capture, JobContext};

/// Asks riders whether a trip actually happened, some hours after departure.
#[derive(Clone)]
pub struct TripCompletionJob {
    ctx: JobContext,
}

pub fn job_name(trip_id: TripId) -> String {
    format!("trip-completion-{}", trip_id.0)
}

pub fn calculate_notification_prompt_time(departure: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    departure + Duration::hours(hours)
}

impl TripCompletionJob {
    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    /// Queues prompts for every confirmed or pending trip. Run once at startup since
    /// scheduled jobs do not outlive the process.
    pub async fn send_notification_for_confirmed_trips(&self) -> Result<usize, ServiceError> {
        let open = [TripStatus::Confirmed, TripStatus::Pending];
        let trips = self.ctx.repos.trips.list(&open, None).await?;
        let scheduled = trips.iter().filter(|trip| self.create_schedule_for_trip(trip)).count();
        info!(
            event_name = "jobs.trip_completion.restored",
            candidates = trips.len(),
            scheduled,
            "trip completion prompts queued"
        );
        Ok(scheduled)
    }

    /// Returns false when the prompt time is already behind us.
    pub fn create_schedule_for_trip(&self, trip: &Trip) -> bool {
        let hours = self.ctx.settings.completion_prompt_hours;
        let fire_at = calculate_notification_prompt_time(trip.departure_time, hours);
        if fire_at <= Utc::now() {
            return false;
        }
        let job = self.clone();
        let trip_id = trip.id;
        self.ctx.scheduler.schedule_at(job_name(trip_id), fire_at, move || async move {
            capture("trip_completion", job.prompt(trip_id).await.map(|_| ()));
        });
        true
    }

    /// Prompts the rider unless the trip ended up cancelled, declined or closed.
    pub async fn prompt(&self, trip_id: TripId) -> Result<bool, ServiceError> {
        let Some(trip) = self.ctx.repos.trips.find_by_id(trip_id).await? else {
            return Ok(false);
        };
        let open = matches!(
            trip.status,
            TripStatus::Confirmed | TripStatus::InTransit | TripStatus::Pending
        );
        if !open {
            return Ok(false);
        }
        let rider = self.ctx.repos.user(trip.rider_id).await?;
        Ok(self.ctx.notifier.send_trip_completion_prompt(&trip, &rider).await.is_sent())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use tembea_core::TripStatus;

    use super::{calculate_notification_prompt_time, job_name, TripCompletionJob};
    use crate::jobs::test_support::{context, trip};

    #[test]
    fn prompt_time_is_departure_plus_hours() {
        let departure = Utc.with_ymd_and_hms(2019, 3, 27, 5, 30, 0).single().expect("valid");

        let prompt = calculate_notification_prompt_time(departure, 2);

        assert_eq!(prompt, Utc.with_ymd_and_hms(2019, 3, 27, 7, 30, 0).single().expect("valid"));
    }

    #[tokio::test]
    async fn startup_queues_open_trips_only() {
        let (ctx, _api) = context().await;
        let soon = Utc::now() + Duration::hours(1);
        let confirmed = trip(&ctx.repos, TripStatus::Confirmed, soon).await;
        let pending = trip(&ctx.repos, TripStatus::Pending, soon).await;
        let completed = trip(&ctx.repos, TripStatus::Completed, soon).await;
        let stale = trip(&ctx.repos, TripStatus::Confirmed, Utc::now() - Duration::days(2)).await;
        let job = TripCompletionJob::new(ctx.clone());

        let scheduled = job.send_notification_for_confirmed_trips().await.expect("restore");

        assert_eq!(scheduled, 2);
        assert!(ctx.scheduler.is_scheduled(&job_name(confirmed.id)));
        assert!(ctx.scheduler.is_scheduled(&job_name(pending.id)));
        assert!(!ctx.scheduler.is_scheduled(&job_name(completed.id)));
        assert!(!ctx.scheduler.is_scheduled(&job_name(stale.id)));
        ctx.scheduler.shutdown();
    }

    #[tokio::test]
    async fn cancelled_trips_get_no_prompt() {
        let (ctx, api) = context().await;
        let cancelled = trip(&ctx.repos, TripStatus::Cancelled, Utc::now()).await;

        let sent = TripCompletionJob::new(ctx).prompt(cancelled.id).await.expect("prompt");

        assert!(!sent);
        assert!(api.calls().await.is_empty());
    }
}
