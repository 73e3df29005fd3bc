//! Persona (role) handlers. Reference data for the chat core: read-mostly,
//! with a simple authenticated create endpoint.

use crate::api::{join_error, pool_error, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use parley_store::{CreateRoleParams, Role};
use std::sync::Arc;

/// Handler for `GET /api/roles`.
pub async fn list_roles_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Role>>, ApiError> {
    let roles = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        parley_store::list_roles(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(roles))
}

/// Handler for `GET /api/roles/{role_id}`.
///
/// Missing and inactive roles are the same 404.
pub async fn get_role_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(role_id): Path<String>,
) -> Result<Json<Role>, ApiError> {
    let role = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        parley_store::get_role(&conn, &role_id).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(role))
}

/// Handler for `POST /api/roles`.
pub async fn create_role_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(params): Json<CreateRoleParams>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    if params.name.trim().is_empty() {
        return Err(ApiError::BadRequest("role name is required".to_string()));
    }
    if params.system_prompt.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "role system prompt is required".to_string(),
        ));
    }

    let role = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        parley_store::create_role(&conn, &params).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    tracing::info!(role_id = %role.id, name = %role.name, "created role");
    Ok((StatusCode::CREATED, Json(role)))
}
