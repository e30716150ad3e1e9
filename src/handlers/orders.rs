use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    entities::order,
    errors::ServiceError,
    services::orders::{PlaceOrderRequest, UpdateOrderStatusRequest},
    ApiResponse, AppState,
};

/// Place an order for the calling customer
pub async fn place_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order::Model>>), ServiceError> {
    let order = state
        .services
        .orders
        .place_order(auth_user.account_id, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(order).with_message("Order placed successfully")),
    ))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state.services.orders.update_status(id, request).await?;
    Ok(Json(
        ApiResponse::success(order).with_message("Order status updated"),
    ))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(Json(
        ApiResponse::success(json!({ "deleted": id })).with_message("Order deleted"),
    ))
}
