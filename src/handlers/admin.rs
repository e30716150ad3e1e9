use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    entities::service,
    errors::ServiceError,
    services::catalog::UpdatePriceRequest,
    ApiResponse, AppState,
};

/// Edit a catalog price; existing orders keep their totals
pub async fn update_service_price(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdatePriceRequest>,
) -> Result<Json<ApiResponse<service::Model>>, ServiceError> {
    let updated = state
        .services
        .catalog
        .update_price(id, request.price_per_kg)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn cleanup_orphans(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let removed = state.services.orders.cleanup_orphans().await?;
    Ok(Json(ApiResponse::success(json!({ "removed": removed }))))
}
