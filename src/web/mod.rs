//! Server-rendered web front end.
//!
//! Holds no signing key and no data of its own: pages are built from API
//! responses, and the token the API issued at login is kept in the server-side
//! session and relayed on every protected call.

pub mod auth;
pub mod client;
pub mod error;
pub mod handlers;
pub mod render;
pub mod session;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    handler::Handler,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, get_service, post_service},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::middleware::Chain;
use crate::standard_chain;
use client::ApiClient;
use session::{load_session, SecureCookies, SessionStore};

#[derive(Clone)]
pub struct WebState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub api: ApiClient,
}

impl WebState {
    pub fn new(config: Arc<AppConfig>, api: ApiClient) -> Self {
        let sessions = SessionStore::new(config.web.session_lifetime());
        Self { config, sessions, api }
    }
}

impl FromRef<WebState> for SessionStore {
    fn from_ref(state: &WebState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<WebState> for SecureCookies {
    fn from_ref(state: &WebState) -> Self {
        SecureCookies(state.config.web.secure_cookies)
    }
}

pub fn router(state: WebState) -> Router {
    use handlers::*;

    let dynamic = Chain::new()
        .append(from_fn_with_state(state.clone(), load_session))
        .append(from_fn(auth::authenticate));
    let protected = dynamic.extend(from_fn(auth::require_authentication));

    Router::new()
        .route("/", get_service(dynamic.then(home.with_state(state.clone()))))
        .route("/about", get_service(dynamic.then(about.with_state(state.clone()))))
        .route("/ping", get(ping))
        .route(
            "/snippets",
            get_service(dynamic.then(list_snippets.with_state(state.clone()))),
        )
        .route(
            "/snippet/create",
            get_service(protected.then(create_snippet_form.with_state(state.clone())))
                .post_service(protected.then(create_snippet.with_state(state.clone()))),
        )
        .route(
            "/snippet/:id",
            get_service(dynamic.then(show_snippet.with_state(state.clone()))),
        )
        .route(
            "/user/login",
            get_service(dynamic.then(login_form.with_state(state.clone())))
                .post_service(dynamic.then(login.with_state(state.clone()))),
        )
        .route(
            "/user/logout",
            post_service(protected.then(logout.with_state(state.clone()))),
        )
        .route(
            "/user/signup",
            get_service(protected.then(signup_form.with_state(state.clone())))
                .post_service(protected.then(signup.with_state(state.clone()))),
        )
        .route(
            "/user/profile",
            get_service(protected.then(profile.with_state(state.clone()))),
        )
        .route(
            "/user/change-password",
            get_service(protected.then(change_password_form.with_state(state.clone())))
                .post_service(protected.then(change_password.with_state(state.clone()))),
        )
        .route("/users", get_service(protected.then(list_users.with_state(state.clone()))))
        .route(
            "/user/:id",
            get_service(protected.then(show_user.with_state(state.clone()))),
        )
        .route(
            "/user/:id/reset-password",
            get_service(protected.then(reset_password_form.with_state(state.clone())))
                .post_service(protected.then(reset_password.with_state(state.clone()))),
        )
        .layer(standard_chain!().into_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
