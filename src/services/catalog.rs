use crate::{
    db::DbPool,
    entities::service::{self, ActiveModel as ServiceActiveModel, Entity as ServiceEntity},
    errors::ServiceError,
};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Services offered out of the box, priced per kilogram.
pub const DEFAULT_SERVICES: [(&str, Decimal); 3] = [
    ("Wash & Fold", dec!(50.00)),
    ("Wash & Iron", dec!(70.00)),
    ("Dry Cleaning", dec!(120.00)),
];

/// Largest price the `services.price_per_kg` column holds.
pub const MAX_PRICE_PER_KG: Decimal = dec!(99999999.99);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriceRequest {
    pub price_per_kg: Decimal,
}

/// Catalog of laundry services
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self) -> Result<Vec<service::Model>, ServiceError> {
        Ok(ServiceEntity::find()
            .order_by_asc(service::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get(&self, service_id: i32) -> Result<service::Model, ServiceError> {
        ServiceEntity::find_by_id(service_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", service_id)))
    }

    /// Changes the per-kilogram price. Orders already placed keep their totals.
    #[instrument(skip(self))]
    pub async fn update_price(
        &self,
        service_id: i32,
        price_per_kg: Decimal,
    ) -> Result<service::Model, ServiceError> {
        let price_per_kg = price_per_kg.round_dp(2);
        if price_per_kg <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price per kilogram must be positive".to_string(),
            ));
        }
        if price_per_kg > MAX_PRICE_PER_KG {
            return Err(ServiceError::ValidationError(format!(
                "Price per kilogram must be at most {}",
                MAX_PRICE_PER_KG
            )));
        }

        let existing = self.get(service_id).await?;
        let mut active: ServiceActiveModel = existing.into();
        active.price_per_kg = Set(price_per_kg);

        let updated = active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, service_id, "Failed to update service price");
            ServiceError::DatabaseError(e)
        })?;

        counter!("laundry_catalog.price_updates", 1);
        info!(service_id, price_per_kg = %updated.price_per_kg, "service price updated");
        Ok(updated)
    }

    /// Inserts any default service missing by name. Returns how many were added.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<usize, ServiceError> {
        let mut created = 0;
        for (name, price) in DEFAULT_SERVICES {
            if self.ensure_service(name, price).await? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Inserts the service unless one with this name exists; existing rows keep their price.
    async fn ensure_service(&self, name: &str, price_per_kg: Decimal) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let exists = ServiceEntity::find()
            .filter(service::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if exists {
            return Ok(false);
        }

        ServiceActiveModel {
            name: Set(name.to_string()),
            price_per_kg: Set(price_per_kg),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(service = name, %price_per_kg, "seeded service");
        Ok(true)
    }
}
