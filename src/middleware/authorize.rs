//! Route-level permission enforcement.
//!
//! [`AuthorizeLayer`] must sit inside the authentication middleware: it reads
//! the [`Identity`] that authentication attached and never looks at the token.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{FromRequestParts, Path, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::auth::{authorize, AuthError, Identity, RequiredPermissions};
use crate::error::ApiError;

/// Path parameter compared against the caller id by the `self` permission.
const RESOURCE_ID_PARAM: &str = "id";

#[derive(Debug, Clone)]
pub struct AuthorizeLayer {
    required: Arc<RequiredPermissions>,
    verbose: bool,
}

impl AuthorizeLayer {
    pub fn new(required: RequiredPermissions) -> Self {
        Self {
            required: Arc::new(required),
            verbose: false,
        }
    }

    /// Logs every decision at info level instead of only denials, and echoes
    /// internal failures in the response body.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl<S> Layer<S> for AuthorizeLayer {
    type Service = Authorize<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Authorize {
            inner,
            required: self.required.clone(),
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Authorize<S> {
    inner: S,
    required: Arc<RequiredPermissions>,
    verbose: bool,
}

impl<S> Service<Request> for Authorize<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let required = self.required.clone();
        let verbose = self.verbose;
        // Swap in the clone so the instance driven by poll_ready is the one called.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            if let Err(err) = check(&mut parts, &required, verbose).await {
                return Ok(ApiError::from_auth(err, verbose).into_response());
            }

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

async fn check(parts: &mut Parts, required: &RequiredPermissions, verbose: bool) -> Result<(), AuthError> {
    let identity = parts
        .extensions
        .get::<Identity>()
        .cloned()
        .ok_or(AuthError::ContextMissing("identity"))?;

    let resource_id = if required.needs_resource_id() {
        resource_id(parts).await
    } else {
        None
    };

    let allowed = authorize(&identity, required, resource_id);

    if verbose {
        tracing::info!(
            user_id = identity.id(),
            roles = ?identity.roles(),
            required = %required,
            resource_id = ?resource_id,
            allowed,
            "authorization decision"
        );
    }

    if allowed {
        Ok(())
    } else {
        tracing::warn!(
            user_id = identity.id(),
            path = %parts.uri.path(),
            "permission denied"
        );
        Err(AuthError::PermissionDenied)
    }
}

/// Positive integer `:id` from the matched route, if there is one.
async fn resource_id(parts: &mut Parts) -> Option<i64> {
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, &())
        .await
        .ok()?;

    params
        .get(RESOURCE_ID_PARAM)
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|id| *id > 0)
}
