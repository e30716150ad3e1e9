use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    auth::AuthUser,
    entities::service,
    errors::ServiceError,
    services::{
        accounts::AccountResponse,
        orders::{OrderView, StatusCount},
    },
    ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub struct CustomerDashboard {
    pub account: AccountResponse,
    pub services: Vec<service::Model>,
    pub orders: Vec<OrderView>,
}

#[derive(Debug, Serialize)]
pub struct StaffDashboard {
    pub username: String,
    pub orders: Vec<OrderView>,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub username: String,
    pub orders: Vec<OrderView>,
    pub accounts: Vec<AccountResponse>,
    pub services: Vec<service::Model>,
    pub status_counts: Vec<StatusCount>,
}

pub async fn customer_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<CustomerDashboard>>, ServiceError> {
    let services = &state.services;
    let account = services.accounts.get(auth_user.account_id).await?;
    Ok(Json(ApiResponse::success(CustomerDashboard {
        account: account.into(),
        services: services.catalog.list().await?,
        orders: services.orders.list_for_account(auth_user.account_id).await?,
    })))
}

pub async fn staff_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<StaffDashboard>>, ServiceError> {
    Ok(Json(ApiResponse::success(StaffDashboard {
        username: auth_user.username,
        orders: state.services.orders.list_all().await?,
    })))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<AdminDashboard>>, ServiceError> {
    let services = &state.services;
    let accounts = services
        .accounts
        .list()
        .await?
        .into_iter()
        .map(AccountResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(AdminDashboard {
        username: auth_user.username,
        orders: services.orders.list_all().await?,
        accounts,
        services: services.catalog.list().await?,
        status_counts: services.orders.status_counts().await?,
    })))
}
