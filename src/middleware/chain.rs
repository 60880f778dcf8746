//! Ordered middleware chains.
//!
//! A [`Chain`] is a list of tower layers composed outermost-first:
//! `Chain::new().append(a).append(b).then(h)` behaves as `a(b(h))`, so `a`
//! sees the request first and the response last. A shared base chain can be
//! reused by many routes and extended per route without being modified.

use tower::layer::util::{Identity as NoLayers, Stack};
use tower::{Layer, ServiceBuilder};

#[derive(Debug, Clone)]
pub struct Chain<L> {
    builder: ServiceBuilder<L>,
}

impl Chain<NoLayers> {
    pub fn new() -> Self {
        Self {
            builder: ServiceBuilder::new(),
        }
    }
}

impl Default for Chain<NoLayers> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> Chain<L> {
    /// Adds `layer` inside every layer already in the chain.
    pub fn append<T>(self, layer: T) -> Chain<Stack<T, L>> {
        Chain {
            builder: self.builder.layer(layer),
        }
    }

    /// Returns a copy of this chain with `layer` appended; `self` stays as it was.
    pub fn extend<T>(&self, layer: T) -> Chain<Stack<T, L>>
    where
        L: Clone,
    {
        self.clone().append(layer)
    }

    /// Wraps the terminal service with every layer of the chain.
    pub fn then<S>(&self, service: S) -> L::Service
    where
        L: Layer<S>,
    {
        self.builder.service(service)
    }

    /// The whole chain as a single layer, for `Router::layer`.
    pub fn into_layer(self) -> ServiceBuilder<L> {
        self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use axum::{
        body::Body,
        extract::{Request, State},
        http::StatusCode,
        middleware::{from_fn_with_state, Next},
        response::{IntoResponse, Response},
    };
    use tower::util::BoxCloneService;
    use tower::{service_fn, ServiceExt};

    type Log = Arc<Mutex<Vec<String>>>;

    async fn recorder(
        State((name, log)): State<(&'static str, Log)>,
        request: Request,
        next: Next,
    ) -> Response {
        log.lock().unwrap().push(format!("{}-before", name));
        let response = next.run(request).await;
        log.lock().unwrap().push(format!("{}-after", name));
        response
    }

    async fn rejecter(
        State((name, log)): State<(&'static str, Log)>,
        _request: Request,
        _next: Next,
    ) -> Response {
        log.lock().unwrap().push(format!("{}-reject", name));
        StatusCode::UNAUTHORIZED.into_response()
    }

    fn handler(log: Log) -> BoxCloneService<Request, Response, Infallible> {
        BoxCloneService::new(service_fn(move |_request: Request| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("H".to_string());
                Ok::<_, Infallible>(StatusCode::OK.into_response())
            }
        }))
    }

    fn request() -> Request {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn outer_layer_sees_request_first_and_response_last() {
        let log: Log = Arc::default();
        let chain = Chain::new()
            .append(from_fn_with_state(("A", log.clone()), recorder))
            .append(from_fn_with_state(("B", log.clone()), recorder));

        let response = chain.then(handler(log.clone())).oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(entries(&log), ["A-before", "B-before", "H", "B-after", "A-after"]);
    }

    #[tokio::test]
    async fn extension_runs_after_base_and_leaves_base_untouched() {
        let log: Log = Arc::default();
        let base = Chain::new().append(from_fn_with_state(("A", log.clone()), recorder));
        let extended = base.extend(from_fn_with_state(("B", log.clone()), recorder));

        extended.then(handler(log.clone())).oneshot(request()).await.unwrap();
        assert_eq!(entries(&log), ["A-before", "B-before", "H", "B-after", "A-after"]);

        log.lock().unwrap().clear();
        base.then(handler(log.clone())).oneshot(request()).await.unwrap();
        assert_eq!(entries(&log), ["A-before", "H", "A-after"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_layers_and_handler() {
        let log: Log = Arc::default();
        let chain = Chain::new()
            .append(from_fn_with_state(("A", log.clone()), recorder))
            .append(from_fn_with_state(("B", log.clone()), rejecter))
            .append(from_fn_with_state(("C", log.clone()), recorder));

        let response = chain.then(handler(log.clone())).oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(entries(&log), ["A-before", "B-reject", "A-after"]);
    }
}
