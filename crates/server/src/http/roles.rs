use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use tembea_core::domain::location::Homebase;
use tembea_core::domain::role::{Role, RoleAssignment, UserRole};
use tembea_core::validation::is_valid_email;

use super::error::ApiError;
use super::extract::ValidatedJson;
use super::requests::{AssignRoleBody, NewHomebaseBody, NewRoleBody};
use super::response::{ApiReply, ApiResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/user", get(user_roles).post(assign_role))
        .route("/homebases", post(create_homebase))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmailQuery {
    email: String,
}

async fn create_role(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewRoleBody>,
) -> Result<ApiReply<Role>, ApiError> {
    let role = state.services.roles.create_new_role(&body.role_name).await?;
    Ok(ApiResponse::created("Role has been created successfully", role))
}

async fn list_roles(State(state): State<AppState>) -> Result<ApiReply<Vec<Role>>, ApiError> {
    let roles = state.services.roles.get_roles().await?;
    Ok(ApiResponse::ok("All User Roles", roles))
}

async fn assign_role(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<AssignRoleBody>,
) -> Result<ApiReply<UserRole>, ApiError> {
    let assignment = state
        .services
        .roles
        .create_user_role(&body.email, &body.role_name, body.homebase_id)
        .await?;
    Ok(ApiResponse::created("Role was successfully assigned to the user", assignment))
}

async fn user_roles(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<ApiReply<Vec<RoleAssignment>>, ApiError> {
    if !is_valid_email(&query.email) {
        return Err(ApiError::bad_request("Please provide a valid email"));
    }
    let roles = state.services.roles.get_user_roles(&query.email).await?;
    Ok(ApiResponse::ok("User roles fetched successfully", roles))
}

async fn create_homebase(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewHomebaseBody>,
) -> Result<ApiReply<Homebase>, ApiError> {
    let homebase = state
        .services
        .homebases
        .create_homebase(&body.homebase_name, &body.country_name)
        .await?;
    Ok(ApiResponse::created("Homebase created successfully", homebase))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use tembea_slack::client::RecordingSlackApi;

    use crate::http::router;
    use crate::http::test_support::send;
    use crate::services::test_support::user;
    use crate::state::test_support::app_state;

    #[tokio::test]
    async fn roles_are_created_then_assigned() {
        let state = app_state(Arc::new(RecordingSlackApi::new())).await;
        user(&state.services.repos, "UOPS", "ops@andela.com").await;

        let admin = json!({ "roleName": "Admin" });
        let (status, _) = send(router(state.clone()), "POST", "/api/v1/roles", admin.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(router(state.clone()), "POST", "/api/v1/roles", admin).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Role already exists");

        let assign = json!({ "email": "ops@andela.com", "roleName": "Admin" });
        let (status, _) = send(router(state.clone()), "POST", "/api/v1/roles/user", assign).await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = "/api/v1/roles/user?email=ops@andela.com";
        let (status, body) = send(router(state), "GET", uri, Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["role"]["name"], "Admin");
    }

    #[tokio::test]
    async fn listing_roles_without_any_is_not_found() {
        let state = app_state(Arc::new(RecordingSlackApi::new())).await;

        let (status, body) = send(router(state), "GET", "/api/v1/roles", Value::Null).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No Existing Roles");
    }
}
