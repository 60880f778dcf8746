// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity (well-formed JSON that fails validation)
    UnprocessableEntity { messages: Vec<String> },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::InvalidJson(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::UnprocessableEntity { messages } => messages.join("; "),
            ApiError::InternalServerError(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::UnprocessableEntity { messages } => json!({ "messages": messages }),
            _ => json!({ "message": self.message() }),
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden(status_text(StatusCode::FORBIDDEN))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unprocessable_entity(messages: Vec<String>) -> Self {
        ApiError::UnprocessableEntity { messages }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    /// Logs `detail` and returns a 500 carrying `message`; `verbose` also echoes the detail.
    pub fn server_error(message: &str, detail: impl std::fmt::Display, verbose: bool) -> Self {
        tracing::error!("{}: {}", message, detail);
        if verbose {
            ApiError::InternalServerError(format!("{}: {}", message, detail))
        } else {
            ApiError::InternalServerError(message.to_string())
        }
    }
}

pub(crate) fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

impl ApiError {
    /// Maps an authentication failure; `verbose` echoes internal detail in 500 bodies.
    pub fn from_auth(err: AuthError, verbose: bool) -> Self {
        match err {
            AuthError::Token(_) => ApiError::unauthorized("invalid JWT"),
            // Never reveal which permission the route wanted
            AuthError::PermissionDenied => ApiError::forbidden(),
            AuthError::ContextMissing(_) => ApiError::server_error("Problem with user data", err, verbose),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::from_auth(err, false)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoRecord => ApiError::not_found("no matching record found"),
            StoreError::InvalidCredentials => ApiError::bad_request(err.to_string()),
            StoreError::DuplicateEmail => ApiError::bad_request(err.to_string()),
            StoreError::Validation(msg) => ApiError::unprocessable_entity(vec![msg]),
            StoreError::Internal(_) => ApiError::server_error("storage failure", err, false),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenError;

    #[test]
    fn auth_errors_map_to_statuses() {
        let err: ApiError = AuthError::Token(TokenError::ExpiredToken).into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::PermissionDenied.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_json(), json!({"message": "Forbidden"}));

        let err: ApiError = AuthError::ContextMissing("identity").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("identity"));

        let verbose = ApiError::from_auth(AuthError::ContextMissing("identity"), true);
        assert_eq!(verbose.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(verbose.message().starts_with("Problem with user data"));
        assert!(verbose.message().contains("identity"));
    }

    #[test]
    fn server_error_hides_detail_unless_verbose() {
        let quiet = ApiError::server_error("unable to create JWT", "disk on fire", false);
        assert_eq!(quiet.message(), "unable to create JWT");

        let verbose = ApiError::server_error("unable to create JWT", "disk on fire", true);
        assert!(verbose.message().contains("disk on fire"));
    }

    #[test]
    fn validation_errors_list_messages() {
        let err = ApiError::unprocessable_entity(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_json(), json!({"messages": ["a", "b"]}));
    }
}
