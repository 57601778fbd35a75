use chrono::Utc;
use secrecy::SecretString;
use tracing::info;

use tembea_core::domain::ids::RouteRequestId;
use tembea_core::domain::route_request::{
    NewRouteRequest, ReviewBlocked, RouteRequestChanges, RouteRequestDetails,
};
use tembea_core::errors::ServiceError;
use tembea_core::{RouteRequest, RouteRequestStatus, User};

use super::{Repositories, TeamDetailsService};

/// Result of an operations review. A request someone already processed, or one the
/// manager has not confirmed, is left untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum Review<T> {
    Done(T),
    Blocked(ReviewBlocked, Box<RouteRequestDetails>),
}

/// HTTP callers see a processed request as a conflict and an unconfirmed one as a bad request.
pub fn blocked_error(blocked: ReviewBlocked) -> ServiceError {
    match blocked {
        ReviewBlocked::AlreadyProcessed(_) => ServiceError::Conflict(blocked.to_string()),
        ReviewBlocked::AwaitingManager => ServiceError::BadRequest(blocked.to_string()),
    }
}

#[derive(Clone)]
pub struct RouteRequestService {
    repos: Repositories,
    teams: TeamDetailsService,
}

impl RouteRequestService {
    pub fn new(repos: Repositories, teams: TeamDetailsService) -> Self {
        Self { repos, teams }
    }

    pub async fn find_by_pk(
        &self,
        id: RouteRequestId,
    ) -> Result<RouteRequestDetails, ServiceError> {
        let request = self
            .repos
            .route_requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route request not found"))?;
        self.repos.route_request_details(request).await
    }

    pub async fn get_route_request_and_token(
        &self,
        id: RouteRequestId,
        team_id: Option<&str>,
    ) -> Result<(RouteRequestDetails, SecretString), ServiceError> {
        let details = self.find_by_pk(id).await?;
        Ok((details, self.teams.token_for(team_id).await))
    }

    pub async fn update_route_request(
        &self,
        id: RouteRequestId,
        changes: RouteRequestChanges,
    ) -> Result<RouteRequestDetails, ServiceError> {
        let mut details = self.find_by_pk(id).await?;
        details.request.apply(changes, Utc::now());
        self.repos.route_requests.update(&details.request).await?;
        self.repos.route_request_details(details.request).await
    }

    pub async fn create_route_request(
        &self,
        request: NewRouteRequest,
    ) -> Result<RouteRequest, ServiceError> {
        Ok(self.repos.route_requests.create(request).await?)
    }

    /// Operations declines the request; the fellow and their manager are told why.
    pub async fn decline_route_request(
        &self,
        id: RouteRequestId,
        reviewer: &User,
        comment: &str,
        team_id: Option<&str>,
    ) -> Result<Review<RouteRequestDetails>, ServiceError> {
        let details = self.find_by_pk(id).await?;
        if let Err(blocked) = details.request.check_reviewable() {
            return Ok(Review::Blocked(blocked, Box::new(details)));
        }

        let declined = self
            .update_route_request(
                id,
                RouteRequestChanges {
                    status: Some(RouteRequestStatus::Declined),
                    ops_reviewer_id: Some(reviewer.id),
                    ops_comment: Some(comment.trim().to_string()),
                    manager_comment: None,
                },
            )
            .await?;
        self.teams.notifier_for(team_id).await.send_route_decline(&declined).await;
        info!(
            event_name = "routes.request.declined",
            route_request_id = id.0,
            reviewer = %reviewer.slack_id,
            "route request declined"
        );
        Ok(Review::Done(declined))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use tembea_core::domain::location::NewAddress;
    use tembea_core::domain::route_request::{NewRouteRequest, ReviewBlocked, RouteRequestChanges};
    use tembea_core::{RouteRequest, RouteRequestStatus};
    use tembea_slack::client::RecordingSlackApi;

    use super::{Review, RouteRequestService};
    use crate::services::test_support::{setup, user};
    use crate::services::{Repositories, TeamDetailsService};

    /// A request from UFELLOW, managed by UMANAGER, forced into `status`.
    pub(crate) async fn route_request(
        repos: &Repositories,
        status: RouteRequestStatus,
    ) -> RouteRequest {
        let fellow = user(repos, "UFELLOW", "fellow@andela.com").await;
        let manager = user(repos, "UMANAGER", "manager@andela.com").await;
        let home = repos
            .locations
            .create_address(NewAddress {
                address: "Kilimani".to_string(),
                latitude: -1.29,
                longitude: 36.78,
            })
            .await
            .expect("home");
        let bus_stop = repos
            .locations
            .create_address(NewAddress {
                address: "Yaya Centre".to_string(),
                latitude: -1.292,
                longitude: 36.787,
            })
            .await
            .expect("bus stop");
        let mut request = service(repos.clone(), Arc::new(RecordingSlackApi::new()))
            .create_route_request(NewRouteRequest {
                fellow_id: fellow.id,
                manager_id: Some(manager.id),
                home_id: home.id,
                bus_stop_id: bus_stop.id,
                route_image_url: None,
                distance: Some(2.5),
            })
            .await
            .expect("request");
        request.status = status;
        repos.route_requests.update(&request).await.expect("status");
        request
    }

    fn service(repos: Repositories, api: Arc<RecordingSlackApi>) -> RouteRequestService {
        let default_token = SecretString::from("xoxb-default".to_string());
        let teams = TeamDetailsService::new(repos.clone(), api, default_token);
        RouteRequestService::new(repos, teams)
    }

    #[tokio::test]
    async fn declining_a_confirmed_request_notifies_fellow_and_manager() {
        let (_pool, repos) = setup().await;
        let request = route_request(&repos, RouteRequestStatus::Confirmed).await;
        let ops = user(&repos, "UOPS", "ops@andela.com").await;
        let api = Arc::new(RecordingSlackApi::new());
        let service = service(repos, api.clone());

        let review = service
            .decline_route_request(request.id, &ops, "No capacity", None)
            .await
            .expect("decline");

        let Review::Done(details) = review else { panic!("expected a decline") };
        assert_eq!(details.request.status, RouteRequestStatus::Declined);
        assert_eq!(details.request.ops_comment.as_deref(), Some("No capacity"));
        assert_eq!(details.ops_reviewer.map(|reviewer| reviewer.slack_id).as_deref(), Some("UOPS"));
        let recipients: Vec<String> = api
            .posted_messages()
            .await
            .into_iter()
            .map(|(channel, _)| channel)
            .collect();
        assert_eq!(recipients, vec!["DUFELLOW".to_string(), "DUMANAGER".to_string()]);
    }

    #[tokio::test]
    async fn processed_requests_are_not_changed_again() {
        let (_pool, repos) = setup().await;
        let request = route_request(&repos, RouteRequestStatus::Approved).await;
        let ops = user(&repos, "UOPS", "ops@andela.com").await;
        let api = Arc::new(RecordingSlackApi::new());
        let service = service(repos, api.clone());

        let review = service
            .decline_route_request(request.id, &ops, "Changed my mind", None)
            .await
            .expect("review");

        assert!(matches!(
            review,
            Review::Blocked(ReviewBlocked::AlreadyProcessed(RouteRequestStatus::Approved), _)
        ));
        let stored = service.find_by_pk(request.id).await.expect("stored");
        assert_eq!(stored.request.status, RouteRequestStatus::Approved);
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn new_requests_start_pending_with_their_locations() {
        let (_pool, repos) = setup().await;
        let request = route_request(&repos, RouteRequestStatus::Pending).await;
        let service = service(repos, Arc::new(RecordingSlackApi::new()));

        let details = service.find_by_pk(request.id).await.expect("stored");

        assert_eq!(details.request.status, RouteRequestStatus::Pending);
        assert_eq!(details.request.distance, Some(2.5));
        assert_eq!(details.home.address, "Kilimani");
        assert_eq!(details.bus_stop.address, "Yaya Centre");
        assert_eq!(details.fellow.slack_id, "UFELLOW");
    }

    #[tokio::test]
    async fn updates_merge_into_the_stored_request() {
        let (_pool, repos) = setup().await;
        let request = route_request(&repos, RouteRequestStatus::Pending).await;
        let service = service(repos, Arc::new(RecordingSlackApi::new()));

        let updated = service
            .update_route_request(
                request.id,
                RouteRequestChanges {
                    status: Some(RouteRequestStatus::Confirmed),
                    manager_comment: Some("Approved by manager".to_string()),
                    ..RouteRequestChanges::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.request.status, RouteRequestStatus::Confirmed);
        assert_eq!(updated.request.manager_comment.as_deref(), Some("Approved by manager"));
        assert_eq!(updated.home.address, "Kilimani");
    }
}
