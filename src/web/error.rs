use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use super::client::ClientError;
use super::render;
use super::session::SessionError;

/// Failures the web tier renders as an error page.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Detail is logged and only shown when `verbose` is set.
    #[error("{detail}")]
    Internal { detail: String, verbose: bool },
}

impl WebError {
    pub fn internal(detail: impl Into<String>) -> Self {
        WebError::Internal {
            detail: detail.into(),
            verbose: false,
        }
    }

    pub fn verbose(self, verbose: bool) -> Self {
        match self {
            WebError::Internal { detail, .. } => WebError::Internal { detail, verbose },
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for WebError {
    fn from(err: SessionError) -> Self {
        WebError::internal(err.to_string())
    }
}

impl From<ClientError> for WebError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NoRecord => WebError::NotFound("Not Found".to_string()),
            other => WebError::internal(other.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let text = match &self {
            WebError::Internal { detail, verbose } => {
                tracing::error!("web request failed: {}", detail);
                if *verbose {
                    format!("{}: {}", crate::error::status_text(status), detail)
                } else {
                    crate::error::status_text(status)
                }
            }
            other => {
                tracing::info!("client error: {}", other);
                crate::error::status_text(status)
            }
        };

        (status, Html(render::error_page(status, &text))).into_response()
    }
}
