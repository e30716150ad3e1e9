use crate::{
    db::DbPool,
    entities::{
        account::{self, Entity as AccountEntity},
        order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, STATUS_PENDING},
        service::{self, Entity as ServiceEntity},
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::{Condition, Expr, Query},
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub service_id: i32,
    pub kilograms: Decimal,
}

/// Width of the `orders.status` column.
pub const MAX_STATUS_LEN: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(max = 50, message = "Status must be at most 50 characters"))]
    pub status: String,
}

/// Largest weight the `orders.kilograms` column holds.
pub const MAX_KILOGRAMS: Decimal = dec!(9999999.999);
/// Weights are recorded to the gram.
pub const KILOGRAM_SCALE: u32 = 3;
/// Largest total the `orders.total_price` column holds.
pub const MAX_TOTAL_PRICE: Decimal = dec!(9999999999.99);

fn validate_kilograms(kilograms: Decimal) -> Result<(), ServiceError> {
    if kilograms <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Kilograms must be greater than zero".to_string(),
        ));
    }
    if kilograms.normalize().scale() > KILOGRAM_SCALE {
        return Err(ServiceError::ValidationError(format!(
            "Kilograms must have at most {} decimal places",
            KILOGRAM_SCALE
        )));
    }
    if kilograms > MAX_KILOGRAMS {
        return Err(ServiceError::ValidationError(format!(
            "Kilograms must be at most {}",
            MAX_KILOGRAMS
        )));
    }
    Ok(())
}

/// Order joined with the names a dashboard shows next to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i32,
    pub account_id: i32,
    pub customer: Option<String>,
    pub service_id: i32,
    pub service: Option<String>,
    pub kilograms: Decimal,
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Price of `kilograms` of laundry at `price_per_kg`, to the centavo.
pub fn compute_total(price_per_kg: Decimal, kilograms: Decimal) -> Result<Decimal, ServiceError> {
    price_per_kg
        .checked_mul(kilograms)
        .map(|total| total.round_dp(2))
        .ok_or_else(|| ServiceError::ValidationError("Order total is out of range".to_string()))
}

/// Order ledger
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Prices the order from the current catalog and records it as Pending
    #[instrument(skip(self, request), fields(service_id = request.service_id, kilograms = %request.kilograms))]
    pub async fn place_order(
        &self,
        account_id: i32,
        request: PlaceOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        validate_kilograms(request.kilograms)?;

        let db = &*self.db_pool;

        AccountEntity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", account_id)))?;

        let service = ServiceEntity::find_by_id(request.service_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Service {} not found", request.service_id))
            })?;

        let total_price = compute_total(service.price_per_kg, request.kilograms)?;
        if total_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Order total rounds to zero; add more weight".to_string(),
            ));
        }
        if total_price > MAX_TOTAL_PRICE {
            return Err(ServiceError::ValidationError(format!(
                "Order total must be at most {}",
                MAX_TOTAL_PRICE
            )));
        }

        let order = OrderActiveModel {
            account_id: Set(account_id),
            service_id: Set(service.id),
            kilograms: Set(request.kilograms),
            total_price: Set(total_price),
            status: Set(STATUS_PENDING.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, account_id, "Failed to create order in database");
            ServiceError::DatabaseError(e)
        })?;

        counter!("laundry_orders.placed", 1);
        info!(order_id = order.id, %total_price, "order placed");
        Ok(order)
    }

    pub async fn get(&self, order_id: i32) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// A customer's orders, newest first
    pub async fn list_for_account(&self, account_id: i32) -> Result<Vec<OrderView>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::AccountId.eq(account_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&*self.db_pool)
            .await?;
        self.with_names(orders).await
    }

    /// Every order in the ledger, newest first
    pub async fn list_all(&self) -> Result<Vec<OrderView>, ServiceError> {
        let orders = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&*self.db_pool)
            .await?;
        self.with_names(orders).await
    }

    async fn with_names(&self, orders: Vec<order::Model>) -> Result<Vec<OrderView>, ServiceError> {
        let db = &*self.db_pool;
        let account_ids: HashSet<i32> = orders.iter().map(|o| o.account_id).collect();
        let service_ids: HashSet<i32> = orders.iter().map(|o| o.service_id).collect();

        let usernames: HashMap<i32, String> = AccountEntity::find()
            .filter(account::Column::Id.is_in(account_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|a| (a.id, a.username))
            .collect();
        let service_names: HashMap<i32, String> = ServiceEntity::find()
            .filter(service::Column::Id.is_in(service_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok(orders
            .into_iter()
            .map(|o| OrderView {
                id: o.id,
                account_id: o.account_id,
                customer: usernames.get(&o.account_id).cloned(),
                service_id: o.service_id,
                service: service_names.get(&o.service_id).cloned(),
                kilograms: o.kilograms,
                total_price: o.total_price,
                status: o.status,
                created_at: o.created_at,
            })
            .collect())
    }

    /// Sets any non-empty status; there is no transition table
    #[instrument(skip(self, request))]
    pub async fn update_status(
        &self,
        order_id: i32,
        request: UpdateOrderStatusRequest,
    ) -> Result<order::Model, ServiceError> {
        let request = UpdateOrderStatusRequest {
            status: request.status.trim().to_string(),
        };
        if request.status.is_empty() {
            return Err(ServiceError::ValidationError(
                "Status must not be empty".to_string(),
            ));
        }
        request.validate()?;

        let existing = self.get(order_id).await?;
        let previous = existing.status.clone();
        let mut active: OrderActiveModel = existing.into();
        active.status = Set(request.status);

        let updated = active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        counter!("laundry_orders.status_updates", 1);
        info!(order_id, from = %previous, to = %updated.status, "order status updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        let result = OrderEntity::delete_by_id(order_id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id, "Failed to delete order");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
        }

        counter!("laundry_orders.deleted", 1);
        info!(order_id, "order deleted");
        Ok(())
    }

    /// Deletes orders whose account or service no longer exists. Returns the count removed.
    #[instrument(skip(self))]
    pub async fn cleanup_orphans(&self) -> Result<u64, ServiceError> {
        let orphaned = Condition::any()
            .add(
                Expr::col((OrderEntity, order::Column::AccountId)).not_in_subquery(
                    Query::select()
                        .column(account::Column::Id)
                        .from(AccountEntity)
                        .to_owned(),
                ),
            )
            .add(
                Expr::col((OrderEntity, order::Column::ServiceId)).not_in_subquery(
                    Query::select()
                        .column(service::Column::Id)
                        .from(ServiceEntity)
                        .to_owned(),
                ),
            );

        let result = OrderEntity::delete_many()
            .filter(orphaned)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Orphan cleanup failed");
                ServiceError::DatabaseError(e)
            })?;

        let removed = result.rows_affected;
        if removed > 0 {
            counter!("laundry_orders.orphans_removed", removed);
            warn!(removed, "removed orphaned orders");
        } else {
            info!("no orphaned orders");
        }
        Ok(removed)
    }

    /// Number of orders per status value
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, ServiceError> {
        let rows: Vec<(String, i64)> = OrderEntity::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(Expr::col(order::Column::Id).count(), "count")
            .group_by(order::Column::Status)
            .order_by_asc(order::Column::Status)
            .into_tuple()
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn total_is_price_times_weight() {
        assert_eq!(compute_total(dec!(50.00), dec!(3.5)).unwrap(), dec!(175.00));
        assert_eq!(compute_total(dec!(120.00), dec!(1)).unwrap(), dec!(120.00));
    }

    #[test]
    fn total_rounds_to_centavos() {
        assert_eq!(compute_total(dec!(70.00), dec!(1.237)).unwrap(), dec!(86.59));
        assert_eq!(compute_total(dec!(0.33), dec!(0.5)).unwrap(), dec!(0.16));
    }

    #[test]
    fn overflowing_total_is_a_validation_error() {
        assert_matches!(
            compute_total(dec!(120.00), Decimal::MAX),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn weight_limits() {
        assert!(validate_kilograms(dec!(0.001)).is_ok());
        assert!(validate_kilograms(dec!(2.500000)).is_ok());
        assert!(validate_kilograms(MAX_KILOGRAMS).is_ok());
        assert_matches!(validate_kilograms(dec!(0)), Err(ServiceError::ValidationError(_)));
        assert_matches!(validate_kilograms(dec!(0.0001)), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            validate_kilograms(dec!(10000000)),
            Err(ServiceError::ValidationError(_))
        );
    }
}
