use std::any::Any;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::ApiError;

/// Logs `remote - version method uri` for every request.
pub async fn log_request(request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    tracing::info!(
        "{} - {:?} {} {}",
        remote,
        request.version(),
        request.method(),
        request.uri()
    );

    next.run(request).await
}

pub fn xss_protection() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    )
}

pub fn frame_options() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"))
}

/// Turns a handler panic into a generic 500 and closes the connection.
pub fn recover_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("recovered from panic: {}", detail);

    let mut response = ApiError::internal_server_error("Internal Server Error").into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Panic recovery, request logging and security headers, outermost first.
#[macro_export]
macro_rules! standard_chain {
    () => {
        $crate::middleware::Chain::new()
            .append(::tower_http::catch_panic::CatchPanicLayer::custom(
                $crate::middleware::common::recover_panic,
            ))
            .append(::axum::middleware::from_fn($crate::middleware::common::log_request))
            .append($crate::middleware::common::xss_protection())
            .append($crate::middleware::common::frame_options())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn standard_chain_sets_headers_and_recovers_panics() {
        let app = Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route("/boom", get(|| async { panic!("handler exploded") as () }))
            .layer(standard_chain!().into_layer());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "deny");
        assert_eq!(response.headers()["x-xss-protection"], "1; mode=block");

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["connection"], "close");
    }
}
