use std::sync::Arc;

use secrecy::SecretString;

use tembea_core::cache::ConversationCache;
use tembea_core::config::{AppConfig, JobsConfig};
use tembea_db::DbPool;
use tembea_slack::{InteractionRouter, SignatureVerifier, SlackWebApi};

use crate::interactions;
use crate::jobs::{ConfirmRouteUseJob, JobContext, JobScheduler, TripCompletionJob, TripReminderJob};
use crate::services::{
    CabService, DepartmentService, DriverService, HomebaseService, ProviderService, Repositories,
    RoleService, RouteRequestService, RouteService, TeamDetailsService, TripService, UserService,
};

/// Every domain service, wired against one set of repositories and one scheduler.
#[derive(Clone)]
pub struct Services {
    pub repos: Repositories,
    pub teams: TeamDetailsService,
    pub departments: DepartmentService,
    pub users: UserService,
    pub roles: RoleService,
    pub homebases: HomebaseService,
    pub providers: ProviderService,
    pub drivers: DriverService,
    pub cabs: CabService,
    pub routes: RouteService,
    pub route_requests: RouteRequestService,
    pub trips: TripService,
    pub route_use: ConfirmRouteUseJob,
    pub completions: TripCompletionJob,
}

impl Services {
    pub fn new(
        repos: Repositories,
        api: Arc<dyn SlackWebApi>,
        bot_token: SecretString,
        scheduler: JobScheduler,
        settings: JobsConfig,
    ) -> Self {
        let teams = TeamDetailsService::new(repos.clone(), api, bot_token);
        let jobs =
            JobContext::new(repos.clone(), scheduler.clone(), teams.default_notifier(), settings);
        let route_use = ConfirmRouteUseJob::new(jobs.clone());
        let reminders = TripReminderJob::new(jobs.clone());
        let completions = TripCompletionJob::new(jobs);

        Self {
            departments: DepartmentService::new(repos.clone()),
            users: UserService::new(repos.clone(), teams.clone()),
            roles: RoleService::new(repos.clone()),
            homebases: HomebaseService::new(repos.clone()),
            providers: ProviderService::new(repos.clone()),
            drivers: DriverService::new(repos.clone(), teams.clone()),
            cabs: CabService::new(repos.clone(), teams.clone()),
            routes: RouteService::new(repos.clone(), teams.clone(), route_use.clone()),
            route_requests: RouteRequestService::new(repos.clone(), teams.clone()),
            trips: TripService::new(
                repos.clone(),
                teams.clone(),
                scheduler,
                reminders,
                completions.clone(),
            ),
            route_use,
            completions,
            teams,
            repos,
        }
    }
}

/// Shared by every HTTP handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub cache: ConversationCache,
    pub scheduler: JobScheduler,
    pub services: Arc<Services>,
    pub interactions: Arc<InteractionRouter>,
    pub signature: Arc<SignatureVerifier>,
}

impl AppState {
    pub fn new(config: &AppConfig, db_pool: DbPool, api: Arc<dyn SlackWebApi>) -> Self {
        let scheduler = JobScheduler::new();
        let cache = ConversationCache::from_config(&config.cache);
        let services = Arc::new(Services::new(
            Repositories::sql(&db_pool),
            api,
            config.slack.bot_token.clone(),
            scheduler.clone(),
            config.jobs.clone(),
        ));
        let interactions = Arc::new(interactions::router(Arc::clone(&services), cache.clone()));
        let signature = Arc::new(SignatureVerifier::new(config.slack.signing_secret.clone()));

        Self { db_pool, cache, scheduler, services, interactions, signature }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use secrecy::SecretString;

    use tembea_core::config::AppConfig;
    use tembea_slack::client::RecordingSlackApi;
    use tembea_slack::SignatureVerifier;

    use super::AppState;
    use crate::services::test_support::setup;

    pub const SIGNING_SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    pub async fn app_state(api: Arc<RecordingSlackApi>) -> AppState {
        let (pool, _repos) = setup().await;
        let mut config = AppConfig::default();
        config.slack.bot_token = SecretString::from("xoxb-test".to_string());
        config.slack.signing_secret = SecretString::from(SIGNING_SECRET.to_string());
        AppState::new(&config, pool, api)
    }

    pub fn signer() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::from(SIGNING_SECRET.to_string()))
    }
}
