use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, TokenCodec};
use crate::error::ApiError;

/// Header the API reads the token from.
pub const TOKEN_HEADER: &str = "authentication";

/// Verifies the request token and attaches the caller's [`Identity`](crate::auth::Identity).
///
/// A missing token and a token that fails verification both end the request
/// with 401; nothing downstream runs.
pub async fn authenticate(
    State(tokens): State<Arc<TokenCodec>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token(request.headers()) else {
        tracing::warn!("request to {} without a token", request.uri().path());
        return Err(ApiError::unauthorized("Unauthorized"));
    };

    let identity = tokens.identity(&token).map_err(|err| {
        tracing::warn!("token rejected for {}: {}", request.uri().path(), err);
        ApiError::from(AuthError::Token(err))
    })?;

    tracing::debug!("authenticated user {} ({})", identity.id(), identity.name());
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Reads `Authentication: <token>`, tolerating a `Bearer ` prefix.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(TOKEN_HEADER)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bare_token_is_canonical() {
        assert_eq!(extract_token(&headers("abc.def.ghi")).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_blank_header_yields_nothing() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers("")), None);
        assert_eq!(extract_token(&headers("Bearer ")), None);
    }

    #[test]
    fn authorization_header_is_not_consulted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers), None);
    }
}
