use crate::{
    auth::{password, Role},
    db::DbPool,
    entities::account::{self, ActiveModel as AccountActiveModel, Entity as AccountEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

pub const DUPLICATE_USERNAME: &str = "Username already exists";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub confirm_password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1, max = 255, message = "Address must be 1 to 255 characters"))]
    pub address: String,
}

/// Account as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<account::Model> for AccountResponse {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role,
            address: model.address,
            created_at: model.created_at,
        }
    }
}

/// Account store: registration, credential checks, profile edits
#[derive(Clone)]
pub struct AccountService {
    db_pool: Arc<DbPool>,
}

impl AccountService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Self-service registration for customers and staff
    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role))]
    pub async fn register(&self, request: RegisterRequest) -> Result<account::Model, ServiceError> {
        let request = RegisterRequest {
            username: request.username.trim().to_string(),
            ..request
        };
        request.validate()?;

        if request.password != request.confirm_password {
            return Err(ServiceError::ValidationError(PASSWORD_MISMATCH.to_string()));
        }

        let role = request
            .role
            .parse::<Role>()
            .ok()
            .filter(|role| role.is_self_registerable())
            .ok_or_else(|| {
                ServiceError::ValidationError("Role must be customer or staff".to_string())
            })?;

        self.create_account(&request.username, &request.password, role)
            .await
    }

    /// Create an account with any role. Used by registration, seeding and the admin CLI.
    #[instrument(skip(self, password), fields(role = %role))]
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<account::Model, ServiceError> {
        if self.find_by_username(username).await?.is_some() {
            counter!("laundry_accounts.duplicate_username", 1);
            return Err(ServiceError::Conflict(DUPLICATE_USERNAME.to_string()));
        }

        let password_hash = password::hash_password(password)?;

        let model = AccountActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            role: Set(role.to_string()),
            address: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| map_unique_violation(e, username))?;

        counter!("laundry_accounts.created", 1);
        info!(account_id = model.id, "account created");
        Ok(model)
    }

    /// Checks credentials; unknown user and wrong password are indistinguishable
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<account::Model, ServiceError> {
        let account = self.find_by_username(request.username.trim()).await?;

        let verified = match &account {
            Some(account) => password::verify_password(&request.password, &account.password_hash)?,
            None => password::verify_unknown_account(&request.password),
        };

        let account = match account {
            Some(account) if verified => account,
            _ => {
                counter!("laundry_auth.login_failures", 1);
                warn!("login rejected");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        info!(account_id = account.id, "login succeeded");
        Ok(account)
    }

    #[instrument(skip(self, request))]
    pub async fn update_address(
        &self,
        account_id: i32,
        request: UpdateAddressRequest,
    ) -> Result<account::Model, ServiceError> {
        let request = UpdateAddressRequest {
            address: request.address.trim().to_string(),
        };
        request.validate()?;

        let account = self.get(account_id).await?;
        let mut active: AccountActiveModel = account.into();
        active.address = Set(Some(request.address));

        active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, account_id, "Failed to update address");
            ServiceError::DatabaseError(e)
        })
    }

    pub async fn get(&self, account_id: i32) -> Result<account::Model, ServiceError> {
        AccountEntity::find_by_id(account_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", account_id)))
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<account::Model>, ServiceError> {
        Ok(AccountEntity::find()
            .filter(account::Column::Username.eq(username))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<account::Model>, ServiceError> {
        Ok(AccountEntity::find()
            .order_by_asc(account::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }
}

fn map_unique_violation(err: DbErr, username: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            warn!(username, "username taken concurrently");
            ServiceError::Conflict(DUPLICATE_USERNAME.to_string())
        }
        _ => {
            error!(error = %err, "Failed to insert account");
            ServiceError::DatabaseError(err)
        }
    }
}
