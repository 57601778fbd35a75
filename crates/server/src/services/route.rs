use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::info;

use tembea_core::domain::ids::{AddressId, ProviderId, RouteBatchId, RouteId, RouteRequestId};
use tembea_core::domain::location::NewAddress;
use tembea_core::domain::route::{
    next_batch_letter, parse_take_off, NewRoute, NewRouteBatch, RouteBatchChanges,
};
use tembea_core::domain::route_request::{RouteRequestChanges, RouteRequestDetails};
use tembea_core::domain::usage::{UsageReport, UsageSummary};
use tembea_core::errors::ServiceError;
use tembea_core::{EntityStatus, Route, RouteBatch, RouteBatchDetails, RouteRequestStatus, User};
use tembea_slack::Delivery;

use super::route_request::Review;
use super::{Repositories, TeamDetailsService};
use crate::jobs::ConfirmRouteUseJob;

/// Fields a route creation request must carry.
pub const EXPECTED_ROUTE_PROPS: [&str; 5] =
    ["routeName", "destination", "takeOffTime", "capacity", "providerId"];

#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSpec {
    pub take_off: String,
    pub capacity: u32,
    pub provider_id: Option<ProviderId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewRouteWithBatch {
    pub route_name: String,
    pub destination: Destination,
    pub image_url: Option<String>,
    pub batch: BatchSpec,
}

/// What operations fills in when approving a route request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteApproval {
    pub route_name: String,
    pub take_off: String,
    pub capacity: u32,
    pub provider_id: ProviderId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApprovedRoute {
    pub request: RouteRequestDetails,
    pub batch: RouteBatchDetails,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchUpdate {
    pub details: RouteBatchDetails,
    pub deactivated: bool,
    pub riders_notified: usize,
}

#[derive(Clone)]
pub struct RouteService {
    repos: Repositories,
    teams: TeamDetailsService,
    route_use: ConfirmRouteUseJob,
}

impl RouteService {
    pub fn new(
        repos: Repositories,
        teams: TeamDetailsService,
        route_use: ConfirmRouteUseJob,
    ) -> Self {
        Self { repos, teams, route_use }
    }

    /// Missing top-level fields of a route creation body, in declaration order.
    pub fn check_request_props(body: &Value) -> Vec<String> {
        EXPECTED_ROUTE_PROPS
            .iter()
            .filter(|prop| matches!(body.get(**prop), None | Some(Value::Null)))
            .map(|prop| (*prop).to_string())
            .collect()
    }

    /// Reuses a known destination address and route name; the batch is always new.
    pub async fn create_new_route_with_batch(
        &self,
        data: NewRouteWithBatch,
    ) -> Result<RouteBatchDetails, ServiceError> {
        let destination = self.find_or_create_address(data.destination).await?;
        let route = self.find_or_create_route(&data.route_name, destination, data.image_url).await?;
        let batch = self.create_route_batch(route.id, data.batch, false).await?;
        self.repos.batch_details(batch).await
    }

    /// Adds the route's next lettered batch and starts its reminder cycle. Batches
    /// born from an approved route request also start the daily attendance prompt.
    pub async fn create_route_batch(
        &self,
        route_id: RouteId,
        spec: BatchSpec,
        from_request: bool,
    ) -> Result<RouteBatch, ServiceError> {
        if spec.capacity == 0 {
            return Err(ServiceError::BadRequest(
                "capacity must be a non-zero integer greater than zero".to_string(),
            ));
        }
        let take_off = parse_take_off(&spec.take_off)
            .map_err(|error| ServiceError::BadRequest(error.to_string()))?;
        if let Some(provider_id) = spec.provider_id {
            self.repos
                .providers
                .find_by_id(provider_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Provider doesnt exist"))?;
        }
        let letters = self.repos.routes.batch_letters(route_id).await?;
        let batch = self
            .repos
            .routes
            .create_batch(NewRouteBatch {
                route_id,
                provider_id: spec.provider_id,
                cab_id: None,
                driver_id: None,
                take_off,
                capacity: spec.capacity,
                batch: next_batch_letter(&letters),
                status: EntityStatus::Active,
            })
            .await?;
        self.start_jobs(&batch, from_request);
        Ok(batch)
    }

    pub async fn duplicate_route_batch(
        &self,
        id: RouteBatchId,
    ) -> Result<RouteBatchDetails, ServiceError> {
        let original = self
            .repos
            .routes
            .find_batch(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route does not exist"))?;
        let letters = self.repos.routes.batch_letters(original.route_id).await?;
        let batch = self.repos.routes.create_batch(original.duplicate(&letters)).await?;
        if batch.status.is_active() {
            self.start_jobs(&batch, false);
        }
        self.repos.batch_details(batch).await
    }

    pub async fn get_route_batch_by_pk(
        &self,
        id: RouteBatchId,
    ) -> Result<RouteBatchDetails, ServiceError> {
        let batch = self
            .repos
            .routes
            .find_batch(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route batch not found"))?;
        self.repos.batch_details(batch).await
    }

    /// Applies the changes and tells every rider. Deactivating a batch also detaches
    /// its riders and stops its jobs.
    pub async fn update_route_batch(
        &self,
        id: RouteBatchId,
        changes: RouteBatchChanges,
        team_id: Option<&str>,
    ) -> Result<BatchUpdate, ServiceError> {
        let mut batch = self
            .repos
            .routes
            .find_batch(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route batch not found"))?;
        let reschedule = changes.take_off.is_some() || changes.status.is_some();
        let deactivated = batch
            .apply(changes)
            .map_err(|error| ServiceError::BadRequest(error.to_string()))?;
        self.repos.routes.update_batch(&batch).await?;

        let riders = self.repos.users.list_by_route_batch(id).await?;
        let details = self.repos.batch_details(batch.clone()).await?;
        let deliveries = self
            .teams
            .notifier_for(team_id)
            .await
            .notify_route_riders(&riders, &details, deactivated)
            .await;
        let riders_notified = deliveries
            .iter()
            .filter(|delivery| **delivery == Delivery::Sent)
            .count();

        if deactivated {
            self.repos.users.clear_route_batch(id).await?;
            self.route_use.cancel(id);
        } else if reschedule && batch.status.is_active() {
            self.start_jobs(&batch, true);
        }
        info!(
            event_name = "routes.batch.updated",
            batch_id = id.0,
            deactivated,
            riders_notified,
            "route batch updated"
        );
        Ok(BatchUpdate { details, deactivated, riders_notified })
    }

    /// Most and least used batches between the two dates, plus the dormant ones.
    pub async fn route_usage_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<UsageSummary, ServiceError> {
        if from > to {
            return Err(ServiceError::BadRequest(
                "The from date must not be after the to date".to_string(),
            ));
        }
        let entries = self.repos.batch_use.usage_entries(from, to).await?;
        Ok(UsageReport::from_entries(&entries).summarize())
    }

    /// Operations approves a confirmed request: the bus stop becomes the destination
    /// of a new route batch, the fellow joins it, and provider, fellow and manager
    /// are notified.
    pub async fn approve_route_request(
        &self,
        id: RouteRequestId,
        reviewer: &User,
        approval: RouteApproval,
        team_id: Option<&str>,
    ) -> Result<Review<ApprovedRoute>, ServiceError> {
        let request = self
            .repos
            .route_requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Route request not found"))?;
        let details = self.repos.route_request_details(request).await?;
        if let Err(blocked) = details.request.check_reviewable() {
            return Ok(Review::Blocked(blocked, Box::new(details)));
        }

        let route = self
            .find_or_create_route(
                &approval.route_name,
                details.bus_stop.id,
                details.request.route_image_url.clone(),
            )
            .await?;
        let spec = BatchSpec {
            take_off: approval.take_off,
            capacity: approval.capacity,
            provider_id: Some(approval.provider_id),
        };
        let batch = self.create_route_batch(route.id, spec, true).await?;

        let mut request = details.request;
        request.apply(
            RouteRequestChanges {
                status: Some(RouteRequestStatus::Approved),
                ops_reviewer_id: Some(reviewer.id),
                ..RouteRequestChanges::default()
            },
            Utc::now(),
        );
        self.repos.route_requests.update(&request).await?;
        let mut fellow = details.fellow;
        fellow.route_batch_id = Some(batch.id);
        self.repos.users.update(&fellow).await?;

        let request = self.repos.route_request_details(request).await?;
        let batch = self.repos.batch_details(batch).await?;
        self.notify_approval(&request, &batch, team_id).await?;
        info!(
            event_name = "routes.request.approved",
            route_request_id = id.0,
            batch_id = batch.batch.id.0,
            reviewer = %reviewer.slack_id,
            "route request approved"
        );
        Ok(Review::Done(ApprovedRoute { request, batch }))
    }

    async fn notify_approval(
        &self,
        request: &RouteRequestDetails,
        batch: &RouteBatchDetails,
        team_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        let notifier = self.teams.notifier_for(team_id).await;
        if let Some(provider) = batch.provider.as_ref() {
            let owner = self.repos.user(provider.provider_user_id).await?;
            notifier.send_route_assignment(provider, &owner.slack_id, batch).await;
        }
        notifier.send_route_approval_to_fellow(request, batch).await;
        notifier.send_route_approval_to_manager(request, batch).await;
        Ok(())
    }

    fn start_jobs(&self, batch: &RouteBatch, with_attendance: bool) {
        self.route_use.schedule_take_off_reminders(batch);
        if with_attendance {
            self.route_use.schedule_batch_start_job(batch);
        }
    }

    async fn find_or_create_address(
        &self,
        destination: Destination,
    ) -> Result<AddressId, ServiceError> {
        let address = destination.address.trim();
        if let Some(existing) = self.repos.locations.find_address_by_text(address).await? {
            return Ok(existing.id);
        }
        let created = self
            .repos
            .locations
            .create_address(NewAddress {
                address: address.to_string(),
                latitude: destination.latitude,
                longitude: destination.longitude,
            })
            .await?;
        Ok(created.id)
    }

    async fn find_or_create_route(
        &self,
        name: &str,
        destination_id: AddressId,
        image_url: Option<String>,
    ) -> Result<Route, ServiceError> {
        let name = name.trim();
        if let Some(route) = self.repos.routes.find_route_by_name(name).await? {
            return Ok(route);
        }
        Ok(self
            .repos
            .routes
            .create_route(NewRoute { name: name.to_string(), image_url, destination_id })
            .await?)
    }
}
