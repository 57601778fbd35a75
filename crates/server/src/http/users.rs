use axum::extract::State;
use axum::routing::post;
use axum::Router;

use tembea_core::User;

use super::error::ApiError;
use super::extract::ValidatedJson;
use super::requests::{NewUserBody, UpdateUserBody};
use super::response::{ApiReply, ApiResponse};
use crate::services::user::UserChanges;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/users", post(create_user).put(update_user))
}

/// Both outcomes answer 200; only the message says whether the user was new.
async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewUserBody>,
) -> Result<ApiReply<User>, ApiError> {
    let (user, created) = state
        .services
        .users
        .new_user_record(&body.slack_url, &body.email)
        .await?;
    let message = if created {
        "User has been successfully created"
    } else {
        "User already exists"
    };
    Ok(ApiResponse::ok(message, user))
}

async fn update_user(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UpdateUserBody>,
) -> Result<ApiReply<User>, ApiError> {
    let changes = UserChanges {
        new_name: body.new_name,
        new_email: body.new_email,
        new_phone_no: body.new_phone_no,
    };
    let user = state.services.users.update_record(&body.slack_url, &body.email, changes).await?;
    Ok(ApiResponse::ok("User record updated", user))
}
