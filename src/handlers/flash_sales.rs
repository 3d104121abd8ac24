use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, PaginatedResponse,
    PaginationParams,
};
use crate::{
    entities::{FlashSaleItemModel, FlashSaleModel},
    errors::ApiError,
    services::promotions::CreateFlashSaleInput,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

/// Public flash sale routes
pub fn flash_sales_routes() -> Router<AppState> {
    Router::new().route("/current", get(current_flash_sale))
}

/// Admin flash sale routes
pub fn admin_flash_sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_flash_sales))
        .route("/", post(create_flash_sale))
        .route("/:id", get(get_flash_sale))
        .route("/:id", delete(delete_flash_sale))
}

/// A flash sale with its per-product discounts
#[derive(Debug, Serialize)]
struct FlashSaleDetail {
    #[serde(flatten)]
    sale: FlashSaleModel,
    items: Vec<FlashSaleItemModel>,
}

/// The flash sale currently running, if any
async fn current_flash_sale(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let running = state
        .services
        .promotions
        .current_flash_sale()
        .await
        .map_err(map_service_error)?;
    let detail = running.map(|r| FlashSaleDetail {
        sale: r.sale,
        items: r.items,
    });
    Ok(success_response(detail))
}

/// List flash sales
async fn list_flash_sales(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (sales, total) = state
        .services
        .promotions
        .list_flash_sales(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        sales,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get a flash sale with its items
async fn get_flash_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (sale, items) = state
        .services
        .promotions
        .get_flash_sale(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(FlashSaleDetail { sale, items }))
}

/// Create a flash sale with its discounted products
async fn create_flash_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateFlashSaleInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let created = state
        .services
        .promotions
        .create_flash_sale(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

/// Delete a flash sale and its items
async fn delete_flash_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .promotions
        .delete_flash_sale(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
