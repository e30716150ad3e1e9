use axum::{extract::State, Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::accounts::{AccountResponse, UpdateAddressRequest},
    ApiResponse, AppState,
};

/// Set the caller's delivery address
pub async fn update_address(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<UpdateAddressRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ServiceError> {
    let account = state
        .services
        .accounts
        .update_address(auth_user.account_id, request)
        .await?;
    Ok(Json(
        ApiResponse::success(AccountResponse::from(account)).with_message("Address updated"),
    ))
}
