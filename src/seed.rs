//! Startup data: the configured admin account and the default catalog.

use serde::Serialize;
use tracing::{info, instrument};

use crate::{auth::Role, config::AppConfig, errors::ServiceError, services::AppServices};

/// What a seeding pass inserted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub admin_created: bool,
    pub services_created: usize,
}

/// Idempotent: rows that already exist are left as they are.
#[instrument(skip_all, fields(admin = %config.admin_username))]
pub async fn seed_defaults(
    services: &AppServices,
    config: &AppConfig,
) -> Result<SeedReport, ServiceError> {
    let admin_created = services
        .accounts
        .find_by_username(&config.admin_username)
        .await?
        .is_none();
    if admin_created {
        services
            .accounts
            .create_account(&config.admin_username, &config.admin_password, Role::Admin)
            .await?;
    }

    let services_created = services.catalog.seed_defaults().await?;

    let report = SeedReport {
        admin_created,
        services_created,
    };
    info!(?report, "seeding complete");
    Ok(report)
}
