use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::Value;

use tembea_core::domain::usage::UsageSummary;
use tembea_core::validation::Validate;
use tembea_core::{RouteBatchDetails, RouteRequest};

use super::error::ApiError;
use super::extract::ValidatedJson;
use super::requests::{NewRouteBody, OpsDecision, RouteRequestDecisionBody, UpdateRouteBatchBody};
use super::response::{ApiReply, ApiResponse};
use super::{parse_id, UsageQuery};
use crate::services::route::RouteService;
use crate::services::route_request::{blocked_error, Review};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/routes", post(create_route))
        .route("/routes/{id}", put(update_route_batch))
        .route("/routes/{id}/duplicate", post(duplicate_route_batch))
        .route("/routes/status/usage", get(route_usage))
        .route("/routes/requests/{id}", put(review_route_request))
}

async fn team_id(state: &AppState, team_url: Option<&str>) -> Result<Option<String>, ApiError> {
    match team_url {
        Some(url) => {
            let team = state.services.teams.get_team_details_by_team_url(url).await?;
            Ok(Some(team.team_id))
        }
        None => Ok(None),
    }
}

/// Missing top-level fields are reported before the body is typed and validated.
async fn create_route(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<ApiReply<RouteBatchDetails>, ApiError> {
    let missing = RouteService::check_request_props(&raw);
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "The following fields are missing: {}",
            missing.join(", ")
        )));
    }
    let body: NewRouteBody =
        serde_json::from_value(raw).map_err(|error| ApiError::bad_request(error.to_string()))?;
    body.validate().map_err(ApiError::validation)?;

    let details = state.services.routes.create_new_route_with_batch(body.into_route()).await?;
    Ok(ApiResponse::ok("Route created successfully", details))
}

async fn duplicate_route_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiReply<RouteBatchDetails>, ApiError> {
    let details = state.services.routes.duplicate_route_batch(parse_id(&id)?).await?;
    Ok(ApiResponse::ok("Route batch duplicated successfully", details))
}

async fn update_route_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateRouteBatchBody>,
) -> Result<ApiReply<RouteBatchDetails>, ApiError> {
    let id = parse_id(&id)?;
    let team_id = team_id(&state, body.team_url.as_deref()).await?;
    let update = state
        .services
        .routes
        .update_route_batch(id, body.changes, team_id.as_deref())
        .await?;
    let message = if update.deactivated {
        "Route batch deactivated"
    } else {
        "Route batch updated successfully"
    };
    Ok(ApiResponse::ok(message, update.details))
}

async fn route_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<ApiReply<UsageSummary>, ApiError> {
    let (from, to) = query.range()?;
    let summary = state.services.routes.route_usage_report(from, to).await?;
    Ok(ApiResponse::ok("Route usage fetched successfully", summary))
}

/// Approves or declines a request that the manager has confirmed. A request already
/// approved or declined is left as it is.
async fn review_route_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<RouteRequestDecisionBody>,
) -> Result<ApiReply<RouteRequest>, ApiError> {
    let id = parse_id(&id)?;
    let reviewer = state.services.users.get_user(&body.reviewer_email).await?;
    let team_id = team_id(&state, Some(&body.team_url)).await?;

    let request = match body.decision() {
        Some(OpsDecision::Approve) => {
            let approval = body
                .approval()
                .ok_or_else(|| ApiError::bad_request("Route approval details are incomplete"))?;
            match state
                .services
                .routes
                .approve_route_request(id, &reviewer, approval, team_id.as_deref())
                .await?
            {
                Review::Done(approved) => approved.request.request,
                Review::Blocked(blocked, _) => return Err(blocked_error(blocked).into()),
            }
        }
        Some(OpsDecision::Decline) => {
            match state
                .services
                .route_requests
                .decline_route_request(id, &reviewer, &body.comment, team_id.as_deref())
                .await?
            {
                Review::Done(declined) => declined.request,
                Review::Blocked(blocked, _) => return Err(blocked_error(blocked).into()),
            }
        }
        None => return Err(ApiError::bad_request("newOpsStatus must be either approve or decline")),
    };
    Ok(ApiResponse::created("This route request has been updated", request))
}
