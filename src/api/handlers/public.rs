use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{Identity, TokenMessage};
use crate::error::ApiError;
use crate::models::{LoginUser, Snippet, ValidJson};
use crate::store::StoreError;

/// GET /
pub async fn home() -> &'static str {
    "Snippets API"
}

/// GET /ping
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "OK" }))
}

/// GET /snippets - latest unexpired snippets, newest first
pub async fn list_snippets(State(state): State<AppState>) -> Result<Json<Vec<Snippet>>, ApiError> {
    let snippets = state
        .snippets
        .latest()
        .await
        .map_err(|e| ApiError::server_error("Unable to get snippets list", e, state.verbose()))?;
    Ok(Json(snippets))
}

/// GET /snippets/:id
pub async fn get_snippet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Snippet>, ApiError> {
    match state.snippets.get(id).await {
        Ok(snippet) => Ok(Json(snippet)),
        Err(StoreError::NoRecord) => {
            tracing::info!("snippet {} not found", id);
            Err(ApiError::not_found(format!("Unable to get snippet {}", id)))
        }
        Err(e) => Err(ApiError::server_error(
            &format!("Unable to get snippet {}", id),
            e,
            state.verbose(),
        )),
    }
}

/// POST /users/login - verify credentials and issue a token
///
/// The returned user is read back from the freshly signed token, so clients
/// see exactly what a verifier will see.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(credentials): ValidJson<LoginUser>,
) -> Result<Json<TokenMessage>, ApiError> {
    let verbose = state.verbose();

    let id = state
        .users
        .authenticate(&credentials.username, &credentials.password)
        .await
        .map_err(|e| {
            tracing::warn!("login failed for {:?}: {}", credentials.username, e);
            ApiError::unauthorized("Unauthorized")
        })?;

    let user = state
        .users
        .get(id)
        .await
        .map_err(|e| ApiError::server_error("unable to get user", e, verbose))?;

    if verbose {
        tracing::info!("creating token for {:?}", credentials.username);
    }
    let identity = Identity::new(user.id, user.name, user.roles);
    let token = state
        .tokens
        .create(&identity)
        .map_err(|e| ApiError::server_error("unable to create JWT", e, verbose))?;

    let user = state
        .tokens
        .identity(&token)
        .map_err(|e| ApiError::server_error("invalid JWT", e, verbose))?;

    Ok(Json(TokenMessage { user, token }))
}
