//! JSON API service: the token authority.
//!
//! Routes are grouped the same way as the handlers: public (no token),
//! protected (any caller satisfying the route's permissions) and elevated
//! (administrators only).

pub mod handlers;

use std::sync::Arc;

use axum::{
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, get_service, post, put_service},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::{RequiredPermissions, TokenCodec, TokenError};
use crate::config::AppConfig;
use crate::middleware::{authenticate, AuthorizeLayer, Chain};
use crate::standard_chain;
use crate::store::{Snippets, Users};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenCodec>,
    pub snippets: Arc<dyn Snippets>,
    pub users: Arc<dyn Users>,
}

impl AppState {
    /// Builds the token codec from `config`; fails when no signing key is configured.
    pub fn new(
        config: Arc<AppConfig>,
        snippets: Arc<dyn Snippets>,
        users: Arc<dyn Users>,
    ) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenCodec::from_config(&config.token)?);
        Ok(Self {
            config,
            tokens,
            snippets,
            users,
        })
    }

    pub fn verbose(&self) -> bool {
        self.config.debug
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::{elevated, protected, public};

    let verbose = state.verbose();
    let authenticated = Chain::new().append(from_fn_with_state(state.tokens.clone(), authenticate));
    let requires = |required: RequiredPermissions| {
        authenticated.extend(AuthorizeLayer::new(required).verbose(verbose))
    };

    let user = requires(RequiredPermissions::new(["user"]));
    let admin = requires(RequiredPermissions::new(["administrator"]));
    let admin_or_self = requires(RequiredPermissions::new(["administrator", "self"]));

    Router::new()
        .route("/", get(public::home))
        .route("/ping", get(public::ping))
        .route(
            "/snippets",
            get(public::list_snippets)
                .post_service(user.then(protected::create_snippet.with_state(state.clone()))),
        )
        .route("/snippets/:id", get(public::get_snippet))
        .route("/users/login", post(public::login))
        .route(
            "/users",
            get_service(admin.then(elevated::list_users.with_state(state.clone())))
                .post_service(admin.then(elevated::create_user.with_state(state.clone()))),
        )
        .route(
            "/users/role-types",
            get_service(admin.then(elevated::list_role_types.with_state(state.clone()))),
        )
        .route(
            "/users/:id",
            get_service(admin_or_self.then(protected::get_user.with_state(state.clone()))),
        )
        .route(
            "/users/:id/change-password",
            put_service(admin_or_self.then(protected::change_password.with_state(state.clone()))),
        )
        .layer(standard_chain!().into_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
