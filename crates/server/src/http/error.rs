use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};
use uuid::Uuid;

use tembea_core::errors::ServiceError;
use tembea_core::validation::FieldError;

use super::response::{ApiBody, ApiMessage};

/// Error half of every API handler; renders the `{success:false, message}` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: ApiMessage,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<ApiMessage>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<ApiMessage>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<ApiMessage>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// A rejected request body always answers with the list of messages.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let messages = errors.into_iter().map(|error| error.message).collect();
        Self::new(StatusCode::BAD_REQUEST, ApiMessage::List(messages))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(service_error: ServiceError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let interface = service_error.into_interface(correlation_id.as_str());
        let status = StatusCode::from_u16(interface.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(
                event_name = "error_tracker.captured",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %interface,
                "request failed"
            );
        } else {
            warn!(
                event_name = "http.request.rejected",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %interface,
                "request rejected"
            );
        }
        Self::new(status, interface.user_messages())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: ApiBody<()> = ApiBody { success: false, message: self.message, data: None };
        (self.status, Json(body)).into_response()
    }
}
