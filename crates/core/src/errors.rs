use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown {kind} status `{value}`")]
    UnknownStatus { kind: &'static str, value: String },
    #[error("`{0}` is not a valid take-off time (expected HH:MM)")]
    InvalidTakeOffTime(String),
    #[error("The parameter provided is not valid. It must be a valid number")]
    InvalidIdentifier(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures raised by the service layer, each mapped to an HTTP status by the interface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {}", .messages.join(", "))]
    BadRequest { messages: Vec<String>, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::ServiceUnavailable { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }

    /// Messages shown to API clients. Persistence and internal details stay in the logs.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            Self::BadRequest { messages, .. } => messages.clone(),
            Self::NotFound { message, .. } | Self::Conflict { message, .. } => {
                vec![message.clone()]
            }
            Self::ServiceUnavailable { .. } => {
                vec!["The service is temporarily unavailable. Please retry shortly.".to_owned()]
            }
            Self::Internal { message, .. } => vec![message.clone()],
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ServiceError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::BadRequest { messages: vec![error.to_string()], correlation_id }
            }
            Self::BadRequest(message) => {
                InterfaceError::BadRequest { messages: vec![message], correlation_id }
            }
            Self::Validation(messages) => InterfaceError::BadRequest { messages, correlation_id },
            Self::NotFound(message) => InterfaceError::NotFound { message, correlation_id },
            Self::Conflict(message) => InterfaceError::Conflict { message, correlation_id },
            Self::Persistence(message) | Self::Integration(message) => {
                InterfaceError::ServiceUnavailable { message, correlation_id }
            }
            Self::Internal(message) => InterfaceError::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DomainError, InterfaceError, ServiceError};

    #[test]
    fn not_found_maps_to_404_with_message() {
        let interface = ServiceError::not_found("Department not found").into_interface("req-1");

        assert_eq!(interface.status_code(), 404);
        assert_eq!(interface.user_messages(), vec!["Department not found".to_string()]);
        assert_eq!(interface.correlation_id(), "req-1");
    }

    #[test]
    fn conflict_maps_to_409() {
        let interface = ServiceError::conflict("Role already exists").into_interface("req-2");
        assert!(matches!(interface, InterfaceError::Conflict { .. }));
        assert_eq!(interface.status_code(), 409);
    }

    #[test]
    fn domain_error_maps_to_bad_request() {
        let interface = ServiceError::from(DomainError::InvalidIdentifier("abc".to_string()))
            .into_interface("req-3");

        assert_eq!(interface.status_code(), 400);
        assert_eq!(
            interface.user_messages(),
            vec!["The parameter provided is not valid. It must be a valid number".to_string()]
        );
    }

    #[test]
    fn persistence_details_are_not_shown_to_clients() {
        let interface =
            ServiceError::Persistence("database lock timeout".to_owned()).into_interface("req-4");

        assert_eq!(interface.status_code(), 503);
        assert!(!interface.user_messages()[0].contains("lock"));
    }
}
