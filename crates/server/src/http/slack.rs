//! `/slack/actions` and `/slack/command`. Both sit behind signature verification.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::Deserialize;
use tracing::error;

use tembea_slack::dialog::DialogErrorResponse;
use tembea_slack::messages::welcome_message;
use tembea_slack::respond::RecordingResponder;
use tembea_slack::{
    DispatchOutcome, InteractionPayload, ResponseUrlResponder, SlackInteractiveMessage,
};

use super::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/slack/actions", post(slack_actions))
        .route("/slack/command", post(slash_command))
}

#[derive(Debug, Deserialize)]
struct ActionForm {
    payload: String,
}

/// Slack only waits three seconds, so the HTTP answer is always 200 unless a dialog
/// submission was rejected; replies travel through the `response_url`.
async fn slack_actions(
    State(state): State<AppState>,
    Form(form): Form<ActionForm>,
) -> Result<Response, ApiError> {
    let payload = InteractionPayload::from_json(&form.payload)
        .map_err(|parse_error| {
            ApiError::bad_request(format!("Invalid interaction payload: {parse_error}"))
        })?
        .trimmed();

    let dispatched = match payload.response_url.as_deref() {
        Some(response_url) => {
            let api = Arc::clone(state.services.teams.api());
            let responder = ResponseUrlResponder::new(api, response_url);
            state.interactions.dispatch(&payload, &responder).await
        }
        None => state.interactions.dispatch(&payload, &RecordingResponder::new()).await,
    };

    match dispatched {
        Ok(DispatchOutcome::ValidationErrors(errors)) => {
            Ok(Json(DialogErrorResponse { errors }).into_response())
        }
        Ok(_) => Ok(StatusCode::OK.into_response()),
        Err(dispatch_error) => {
            error!(
                event_name = "error_tracker.captured",
                callback_id = payload.callback_id.as_deref().unwrap_or_default(),
                user_id = %payload.user.id,
                error = %dispatch_error,
                "interaction reply could not be delivered"
            );
            Ok(StatusCode::OK.into_response())
        }
    }
}

async fn slash_command() -> Json<SlackInteractiveMessage> {
    Json(welcome_message())
}
