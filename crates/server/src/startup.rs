//! One-off work done after bootstrap and before the listener accepts requests.
//! None of it may stop the server from starting.

use tracing::{error, info};

use tembea_core::cache::ConversationCache;
use tembea_core::config::AdminConfig;
use tembea_db::{ensure_super_admins, AdminSeedReport, DbPool};

use crate::state::AppState;

/// Startup summary, logged once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub admins: Option<AdminSeedReport>,
    pub flushed_entries: usize,
    pub completion_prompts: usize,
}

pub async fn run(state: &AppState, admin: &AdminConfig) -> StartupReport {
    let admins = ensure_super_admin_exists(&state.db_pool, admin).await;
    let flushed_entries = flush_stale_cache(&state.cache);
    let restored = state
        .services
        .completions
        .send_notification_for_confirmed_trips()
        .await;
    let completion_prompts = match restored {
        Ok(scheduled) => scheduled,
        Err(startup_error) => {
            error!(
                event_name = "error_tracker.captured",
                task = "completion_prompts",
                error = %startup_error,
                "could not restore trip completion prompts"
            );
            0
        }
    };

    let report = StartupReport { admins, flushed_entries, completion_prompts };
    info!(
        event_name = "system.startup.completed",
        admins_seeded = report.admins.is_some(),
        flushed_entries = report.flushed_entries,
        completion_prompts = report.completion_prompts,
        "startup tasks finished"
    );
    report
}

/// Seeds the configured super admins. `None` when seeding failed; the error is logged.
pub async fn ensure_super_admin_exists(
    pool: &DbPool,
    admin: &AdminConfig,
) -> Option<AdminSeedReport> {
    match ensure_super_admins(pool, &admin.super_admins()).await {
        Ok(report) => Some(report),
        Err(seed_error) => {
            error!(
                event_name = "error_tracker.captured",
                task = "ensure_super_admin_exists",
                error = %seed_error,
                "could not seed super admins"
            );
            None
        }
    }
}

/// Conversation state from before a restart is meaningless; returns how much was dropped.
pub fn flush_stale_cache(cache: &ConversationCache) -> usize {
    let dropped = cache.len();
    cache.flush();
    dropped
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};

    use tembea_core::cache::ConversationCache;
    use tembea_core::config::AdminConfig;
    use tembea_core::domain::role::SUPER_ADMIN_ROLE;
    use tembea_core::TripStatus;
    use tembea_slack::client::RecordingSlackApi;

    use super::{ensure_super_admin_exists, flush_stale_cache, run};
    use crate::jobs::trip_completion::job_name;
    use crate::jobs::test_support::trip;
    use crate::state::test_support::app_state;

    fn admins() -> AdminConfig {
        AdminConfig {
            super_admin_email: Some("tembea.devs@andela.com".to_string()),
            super_admin_slack_id: Some("UADMIN".to_string()),
            ..AdminConfig::default()
        }
    }

    #[tokio::test]
    async fn super_admins_are_seeded_once() {
        let state = app_state(Arc::new(RecordingSlackApi::new())).await;

        let first = ensure_super_admin_exists(&state.db_pool, &admins()).await.expect("seeded");
        let second = ensure_super_admin_exists(&state.db_pool, &admins())
            .await
            .expect("seeded again");

        assert_eq!(first.users_created, 1);
        assert_eq!(first.roles_assigned, 1);
        assert_eq!(second.users_created, 0);
        assert_eq!(second.roles_assigned, 0);
        let admin = state
            .services
            .repos
            .users
            .find_by_slack_id("UADMIN")
            .await
            .expect("find")
            .expect("admin");
        assert_eq!(admin.name, "Tembea Devs");
        let role = state.services.repos.roles.find_by_name(SUPER_ADMIN_ROLE).await.expect("role");
        assert!(role.is_some());
    }

    #[tokio::test]
    async fn seeding_failures_do_not_stop_startup() {
        let state = app_state(Arc::new(RecordingSlackApi::new())).await;
        state.db_pool.close().await;

        assert!(ensure_super_admin_exists(&state.db_pool, &admins()).await.is_none());
    }

    #[test]
    fn flushing_reports_what_was_dropped() {
        let cache = ConversationCache::new(StdDuration::from_secs(60), 10);
        cache.save("TRIP_REQUEST_U1", "forMe", true);
        cache.save("TRIP_REQUEST_U2", "forMe", false);

        assert_eq!(flush_stale_cache(&cache), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn startup_restores_completion_prompts_for_open_trips() {
        let state = app_state(Arc::new(RecordingSlackApi::new())).await;
        let repos = &state.services.repos;
        let upcoming = trip(repos, TripStatus::Confirmed, Utc::now() + Duration::hours(3)).await;
        let finished = trip(repos, TripStatus::Completed, Utc::now() + Duration::hours(3)).await;
        state.cache.save("TRIP_REQUEST_U1", "forMe", true);

        let report = run(&state, &admins()).await;

        assert_eq!(report.completion_prompts, 1);
        assert_eq!(report.flushed_entries, 1);
        assert!(state.scheduler.is_scheduled(&job_name(upcoming.id)));
        assert!(!state.scheduler.is_scheduled(&job_name(finished.id)));
        state.scheduler.shutdown();
    }
}
