use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::{ChangeUserPassword, Snippet, SnippetCreate, User, ValidJson};
use crate::store::StoreError;

/// POST /snippets (role `user`)
pub async fn create_snippet(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SnippetCreate>,
) -> Result<Json<Snippet>, ApiError> {
    let verbose = state.verbose();
    let lifetime = body
        .lifetime()
        .ok_or_else(|| ApiError::unprocessable_entity(vec!["expires: This field is invalid".into()]))?;

    if verbose {
        tracing::info!("inserting snippet {:?}", body.title);
    }

    let id = state
        .snippets
        .insert(&body.title, &body.content, lifetime)
        .await
        .map_err(|e| ApiError::server_error("Problem inserting snippet data", e, verbose))?;

    let snippet = state
        .snippets
        .get(id)
        .await
        .map_err(|e| ApiError::server_error("Problem getting snippet data", e, verbose))?;

    Ok(Json(snippet))
}

/// GET /users/:id (`administrator` or `self`)
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<User>, ApiError> {
    match state.users.get(id).await {
        Ok(user) => Ok(Json(user)),
        Err(StoreError::NoRecord) => Err(ApiError::not_found(format!("Unable to get user {}", id))),
        Err(e) => Err(ApiError::server_error(
            &format!("Unable to get user {}", id),
            e,
            state.verbose(),
        )),
    }
}

/// PUT /users/:id/change-password (`administrator` or `self`)
///
/// An administrator changing someone else's password skips the old-password check.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<ChangeUserPassword>,
) -> Result<Json<Value>, ApiError> {
    let result = if caller.is_admin() && caller.id() != id {
        state.users.reset_password(id, &body.new_password).await
    } else {
        state
            .users
            .change_password(id, &body.old_password, &body.new_password)
            .await
    };

    if let Err(e) = result {
        tracing::warn!("password change for user {} failed: {}", id, e);
        return Err(e.into());
    }

    if state.verbose() {
        tracing::info!("password changed for user {}", id);
    }

    Ok(Json(json!({
        "message": format!("Password changed for user {} with success", id)
    })))
}
