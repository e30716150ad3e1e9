use axum::{extract::State, http::HeaderMap, response::Redirect, Json};
use serde_json::{json, Value};

use crate::{errors::ServiceError, errors::LOGIN_ENTRY, ApiResponse, AppState};

/// Send the caller to their dashboard, or to login without a valid session
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    match state.auth.authenticate_headers(&headers).await {
        Ok(user) => Redirect::to(user.role.dashboard_path()),
        Err(_) => Redirect::to(LOGIN_ENTRY),
    }
}

pub async fn about(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let offered: Vec<String> = state
        .services
        .catalog
        .list()
        .await?
        .into_iter()
        .map(|s| s.name)
        .collect();
    Ok(Json(ApiResponse::success(json!({
        "name": "Laundry Service",
        "description": "Drop off your laundry, pick a service, pay by the kilogram.",
        "currency": state.config.currency,
        "services": offered,
    }))))
}
