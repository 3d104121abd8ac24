use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, put},
    Router,
};

/// Admin store settings routes
pub fn admin_settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_settings))
        .route("/:key", get(get_setting))
        .route("/:key", put(put_setting))
        .route("/:key", delete(delete_setting))
}

/// List all settings
async fn list_settings(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let settings = state
        .services
        .settings
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(settings))
}

/// Get a setting by key
async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let setting = state
        .services
        .settings
        .get(&key)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(setting))
}

/// Create or replace a setting
async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let setting = state
        .services
        .settings
        .put(&key, value)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(setting))
}

/// Delete a setting
async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .settings
        .delete(&key)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
