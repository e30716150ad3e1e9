//! Domain services. Each one owns a handle to the pool and acquires a
//! connection per call.

pub mod accounts;
pub mod catalog;
pub mod orders;

use std::sync::Arc;

use crate::db::DbPool;

/// Service bundle shared by handlers, the startup path and the admin CLI
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<accounts::AccountService>,
    pub catalog: Arc<catalog::CatalogService>,
    pub orders: Arc<orders::OrderService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            accounts: Arc::new(accounts::AccountService::new(db.clone())),
            catalog: Arc::new(catalog::CatalogService::new(db.clone())),
            orders: Arc::new(orders::OrderService::new(db)),
        }
    }
}
