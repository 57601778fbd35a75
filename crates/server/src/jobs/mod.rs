//! Timed notifications: trip reminders, trip completion prompts and the daily
//! route-use cycle. Every job re-reads the database when it fires, so a job for a
//! record that changed in the meantime does nothing.

pub mod route_use;
pub mod scheduler;
pub mod trip_completion;
pub mod trip_reminder;

use tracing::error;

use tembea_core::config::JobsConfig;
use tembea_core::errors::ServiceError;
use tembea_slack::Notifier;

use crate::services::Repositories;

pub use route_use::ConfirmRouteUseJob;
pub use scheduler::JobScheduler;
pub use trip_completion::TripCompletionJob;
pub use trip_reminder::TripReminderJob;

/// What a fired job needs to look things up and talk to Slack.
#[derive(Clone)]
pub struct JobContext {
    pub repos: Repositories,
    pub scheduler: JobScheduler,
    pub notifier: Notifier,
    pub settings: JobsConfig,
}

impl JobContext {
    pub fn new(
        repos: Repositories,
        scheduler: JobScheduler,
        notifier: Notifier,
        settings: JobsConfig,
    ) -> Self {
        Self { repos, scheduler, notifier, settings }
    }
}

/// Jobs have nobody to report to; failures end up in the log.
fn capture(job: &'static str, outcome: Result<(), ServiceError>) {
    if let Err(job_error) = outcome {
        error!(
            event_name = "error_tracker.captured",
            job,
            error = %job_error,
            "scheduled job failed"
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use secrecy::SecretString;

    use tembea_core::config::JobsConfig;
    use tembea_core::domain::trip::NewTrip;
    use tembea_core::{Trip, TripStatus, TripType};
    use tembea_slack::client::RecordingSlackApi;
    use tembea_slack::Notifier;

    use super::{JobContext, JobScheduler};
    use crate::services::test_support::{setup, user};
    use crate::services::Repositories;

    pub fn settings() -> JobsConfig {
        JobsConfig {
            reminder_lead_minutes: 60,
            completion_prompt_hours: 2,
            route_confirmation_delay_minutes: 120,
        }
    }

    pub async fn context() -> (JobContext, Arc<RecordingSlackApi>) {
        let (_pool, repos) = setup().await;
        let api = Arc::new(RecordingSlackApi::new());
        let notifier = Notifier::new(api.clone(), SecretString::from("xoxb-test".to_string()));
        (JobContext::new(repos, JobScheduler::new(), notifier, settings()), api)
    }

    /// A trip for the shared test rider, forced into `status`.
    pub async fn trip(
        repos: &Repositories,
        status: TripStatus,
        departure_time: DateTime<Utc>,
    ) -> Trip {
        let rider = match repos.users.find_by_slack_id("URIDER").await.expect("lookup") {
            Some(rider) => rider,
            None => user(repos, "URIDER", "rider@andela.com").await,
        };
        let mut trip = repos
            .trips
            .create(NewTrip {
                name: "Trip to Jomo Kenyatta Airport".to_string(),
                rider_id: rider.id,
                requested_by_id: rider.id,
                origin: "Andela Nairobi".to_string(),
                destination: "Jomo Kenyatta Airport".to_string(),
                departure_time,
                trip_type: TripType::Airport,
                no_of_passengers: 1,
                reason: Some("Flight home".to_string()),
                provider_id: None,
            })
            .await
            .expect("trip");
        trip.status = status;
        repos.trips.update(&trip).await.expect("status");
        trip
    }
}
