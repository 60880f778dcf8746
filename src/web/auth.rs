//! Session-based authentication for the web tier.
//!
//! The web tier has no signing key. It reads the token it was handed by the
//! API with [`decode_claims_unverified`] only to decide whether to show the
//! caller as logged in; every state-changing call is relayed to the API, which
//! verifies the token itself.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::error::WebError;
use super::session::{Session, KEY_FLASH, KEY_REDIRECT_PATH, KEY_TOKEN};
use crate::auth::{decode_claims_unverified, SessionUser, TokenError};

pub const LOGIN_PATH: &str = "/user/login";

pub const FLASH_EXPIRED: &str = "You've been logged out - authentication expired, please logon!";
pub const FLASH_LOGIN_REQUIRED: &str = "Operation requires authentication, please logon!";

/// What the session keeps for a logged-in browser: the raw token to relay and
/// the user read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub user: SessionUser,
    pub token: String,
}

impl SessionToken {
    /// Reads the user out of `token` without checking its signature.
    pub fn from_token(token: String) -> Result<Self, TokenError> {
        let claims = decode_claims_unverified(&token)?;
        Ok(Self {
            user: claims.session_user(),
            token,
        })
    }
}

/// Soft authentication: never rejects a request.
///
/// No session token leaves the request anonymous. An expired or unreadable
/// token is dropped from the session, a flash explains why, and the request
/// continues anonymous. Otherwise the [`SessionToken`] is attached.
pub async fn authenticate(session: Session, mut request: Request, next: Next) -> Result<Response, WebError> {
    if !session.exists(KEY_TOKEN).await {
        return Ok(next.run(request).await);
    }

    let Some(stored) = session.get::<SessionToken>(KEY_TOKEN).await? else {
        return Ok(next.run(request).await);
    };

    match decode_claims_unverified(&stored.token) {
        Ok(claims) if claims.is_expired() => {
            tracing::info!("session token for user {} expired", stored.user.id);
            session.remove(KEY_TOKEN).await;
            session.flash(FLASH_EXPIRED).await?;
        }
        Ok(_) => {
            request.extensions_mut().insert(stored);
        }
        Err(e) => {
            tracing::warn!("dropping unreadable session token: {}", e);
            session.remove(KEY_TOKEN).await;
        }
    }

    Ok(next.run(request).await)
}

/// Sends anonymous callers to the login page, remembering where they were going.
pub async fn require_authentication(session: Session, request: Request, next: Next) -> Result<Response, WebError> {
    if request.extensions().get::<SessionToken>().is_none() {
        session.flash(FLASH_LOGIN_REQUIRED).await?;
        session.put(KEY_REDIRECT_PATH, &request.uri().path()).await?;
        return Ok((StatusCode::FOUND, [(header::LOCATION, LOGIN_PATH)]).into_response());
    }

    let mut response = next.run(request).await;
    // Authenticated pages must not be cached by the browser or proxies.
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Handler argument for pages behind [`require_authentication`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub SessionToken);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| WebError::internal("no user available on session"))
    }
}

/// Everything a page render needs from the session: the pending flash and the
/// logged-in user, if any.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub flash: Option<String>,
    pub user: Option<SessionUser>,
}

impl PageContext {
    /// Consumes the pending flash; call only when a page is actually rendered.
    pub async fn load(session: &Session, current: Option<&Authenticated>) -> Result<Self, WebError> {
        Ok(PageContext {
            flash: session.pop::<String>(KEY_FLASH).await?,
            user: current.map(|Authenticated(stored)| stored.user.clone()),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(SessionUser::is_admin)
    }
}
