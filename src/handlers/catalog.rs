use axum::{extract::State, Json};
use serde::Serialize;

use crate::{entities::service, errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub currency: String,
    pub services: Vec<service::Model>,
}

pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CatalogResponse>>, ServiceError> {
    let services = state.services.catalog.list().await?;
    Ok(Json(ApiResponse::success(CatalogResponse {
        currency: state.config.currency.clone(),
        services,
    })))
}
