use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// A single message, or the list of validation messages on a rejected body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiMessage {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for ApiMessage {
    fn from(message: &str) -> Self {
        Self::Text(message.to_string())
    }
}

impl From<String> for ApiMessage {
    fn from(message: String) -> Self {
        Self::Text(message)
    }
}

impl From<Vec<String>> for ApiMessage {
    fn from(mut messages: Vec<String>) -> Self {
        if messages.len() == 1 {
            Self::Text(messages.remove(0))
        } else {
            Self::List(messages)
        }
    }
}

/// `{success, message, data}`; `data` is left out when there is none.
#[derive(Clone, Debug, Serialize)]
pub struct ApiBody<T> {
    pub success: bool,
    pub message: ApiMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiReply<T> = (StatusCode, Json<ApiBody<T>>);

pub struct ApiResponse;

impl ApiResponse {
    pub fn send<T: Serialize>(
        status: StatusCode,
        success: bool,
        message: impl Into<ApiMessage>,
        data: Option<T>,
    ) -> ApiReply<T> {
        (status, Json(ApiBody { success, message: message.into(), data }))
    }

    pub fn ok<T: Serialize>(message: impl Into<ApiMessage>, data: T) -> ApiReply<T> {
        Self::send(StatusCode::OK, true, message, Some(data))
    }

    pub fn created<T: Serialize>(message: impl Into<ApiMessage>, data: T) -> ApiReply<T> {
        Self::send(StatusCode::CREATED, true, message, Some(data))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::{ApiMessage, ApiResponse};

    #[test]
    fn envelope_omits_missing_data() {
        let (status, body) =
            ApiResponse::send::<()>(StatusCode::NOT_FOUND, false, "Route does not exist", None);

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&body.0).expect("serialize"),
            json!({ "success": false, "message": "Route does not exist" })
        );
    }

    #[test]
    fn several_messages_stay_a_list() {
        let message = ApiMessage::from(vec![
            "Please Provide a name".to_string(),
            "Please Provide a email".to_string(),
        ]);

        assert_eq!(
            serde_json::to_value(message).expect("serialize"),
            json!(["Please Provide a name", "Please Provide a email"])
        );
    }
}
