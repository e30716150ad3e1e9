use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::{AuthUser, IssuedToken},
    errors::{ServiceError, LOGIN_ENTRY},
    services::accounts::{AccountResponse, LoginRequest, RegisterRequest},
    ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub struct RegisteredAccount {
    pub account: AccountResponse,
    pub redirect_to: String,
}

/// Create a customer or staff account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredAccount>>), ServiceError> {
    let account = state.services.accounts.register(request).await?;
    let body = ApiResponse::success(RegisteredAccount {
        account: account.into(),
        redirect_to: LOGIN_ENTRY.to_string(),
    })
    .with_message("Registration successful, please log in");
    Ok((StatusCode::CREATED, Json(body)))
}

/// What a client needs to render the login form
pub async fn login_hint() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "method": "POST",
        "action": LOGIN_ENTRY,
        "fields": ["username", "password"],
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<IssuedToken>>, ServiceError> {
    let account = state.services.accounts.authenticate(&request).await?;
    let issued = state.auth.issue_token(&account).map_err(|e| {
        tracing::error!(error = %e, account_id = account.id, "token issue failed");
        ServiceError::InternalError(e.to_string())
    })?;
    Ok(Json(ApiResponse::success(issued)))
}

/// Ends the caller's session
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Json<ApiResponse<Value>> {
    state.auth.revoke(&auth_user).await;
    Json(
        ApiResponse::success(json!({ "redirect_to": LOGIN_ENTRY }))
            .with_message("Successfully logged out"),
    )
}
