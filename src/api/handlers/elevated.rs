use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::error::ApiError;
use crate::models::{CreateUser, RoleType, User, ValidJson};

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .users
        .get_all()
        .await
        .map_err(|e| ApiError::server_error("Unable to get users list", e, state.verbose()))?;
    Ok(Json(users))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateUser>,
) -> Result<Json<Value>, ApiError> {
    let id = state
        .users
        .insert(&body.name, &body.email, &body.password, &body.roles)
        .await
        .map_err(|e| {
            tracing::warn!("user creation failed: {}", e);
            ApiError::from(e)
        })?;

    tracing::info!("created user {} ({:?})", id, body.name);

    Ok(Json(json!({
        "message": format!("User {:?} created with success", body.name)
    })))
}

/// GET /users/role-types
pub async fn list_role_types(State(state): State<AppState>) -> Result<Json<Vec<RoleType>>, ApiError> {
    let roles = state
        .users
        .role_types()
        .await
        .map_err(|e| ApiError::server_error("Unable to get role types list", e, state.verbose()))?;
    Ok(Json(roles))
}
