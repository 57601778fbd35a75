//! REST API under `/api/v1`, plus the Slack endpoints.
//!
//! Every response uses the `{success, message, data}` envelope; see [`response`].

pub mod departments;
pub mod error;
pub mod extract;
pub mod fleet;
pub mod requests;
pub mod response;
pub mod roles;
pub mod routes;
pub mod slack;
pub mod users;

use std::str::FromStr;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use tembea_core::{DomainError, PageRequest, ProviderId};
use tembea_slack::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

use crate::health;
use crate::state::AppState;
use error::ApiError;

/// Slack bodies are small; anything bigger is not from Slack.
const MAX_SLACK_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(departments::routes())
        .merge(users::routes())
        .merge(roles::routes())
        .merge(routes::routes())
        .merge(fleet::routes())
        .merge(slack::routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_slack_signature,
        )));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state.clone())
        .merge(health::router(&state))
        .layer(TraceLayer::new_for_http())
}

/// Path ids arrive as text so a bad id gets the domain message instead of axum's rejection.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(|error: DomainError| ApiError::bad_request(error.to_string()))
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub provider_id: Option<ProviderId>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UsageQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl UsageQuery {
    /// Both dates are `YYYY-MM-DD`; a missing `to` means today and a missing `from`
    /// means thirty days before `to`.
    pub fn range(&self) -> Result<(NaiveDate, NaiveDate), ApiError> {
        let parse = |field: &str, value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| {
                    ApiError::bad_request(format!(
                        "{field} must be a date in the format YYYY-MM-DD"
                    ))
                })
        };
        let to = match self.to.as_deref() {
            Some(to) => parse("to", to)?,
            None => Utc::now().date_naive(),
        };
        let from = match self.from.as_deref() {
            Some(from) => parse("from", from)?,
            None => to - chrono::Duration::days(30),
        };
        Ok((from, to))
    }
}

/// Buffers the body, checks `X-Slack-Signature` against it and hands the request on.
async fn verify_slack_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_SLACK_BODY_BYTES)
        .await
        .map_err(|_| ApiError::bad_request("Request body is too large"))?;

    let header = |name: &str| parts.headers.get(name).and_then(|value| value.to_str().ok());
    let verified = state.signature.verify(
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
        &bytes,
        Utc::now().timestamp(),
    );
    if let Err(signature_error) = verified {
        warn!(
            event_name = "slack.request.rejected",
            path = %parts.uri.path(),
            error = %signature_error,
            "slack signature verification failed"
        );
        return Err(ApiError::unauthorized("Slack request verification failed"));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::Value;

    use tembea_slack::client::RecordingSlackApi;

    use super::test_support::send;
    use super::{router, UsageQuery};
    use crate::state::test_support::app_state;

    #[tokio::test]
    async fn health_is_served_outside_the_api_prefix() {
        let state = app_state(Arc::new(RecordingSlackApi::new())).await;

        let (status, body) = send(router(state), "GET", "/health", Value::Null).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[test]
    fn usage_dates_must_be_iso_dates() {
        let query = UsageQuery {
            from: Some("01/03/2019".to_string()),
            to: Some("2019-03-31".to_string()),
        };
        assert_eq!(query.range().expect_err("invalid").status(), StatusCode::BAD_REQUEST);

        let query = UsageQuery { from: None, to: Some("2019-03-31".to_string()) };
        let (from, to) = query.range().expect("defaults");
        assert_eq!((to - from).num_days(), 30);
    }
}
