/*!
 * # Authentication and Authorization Module
 *
 * Sessions are signed HS256 JWTs carrying the account id, username and role.
 * Logging out places the token id on an in-memory revocation list until the
 * token would have expired anyway.
 *
 * Routes are gated with [`AuthRouterExt`]: `with_auth` requires a valid
 * token, `with_roles` additionally requires the token's role to be in a set.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::account;
use crate::errors::{ErrorResponse, LOGIN_ENTRY};

pub mod password;
mod rbac;

pub use rbac::*;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Account id
    pub username: String, // Account username at issue time
    pub role: Role,       // Account role at issue time
    pub jti: String,      // Token id, used for revocation
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub account_id: i32,
    pub username: String,
    pub role: Role,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let account_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AuthError::InvalidToken)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::InvalidToken)?;
        Ok(Self {
            account_id,
            username: claims.username,
            role: claims.role,
            token_id: claims.jti,
            expires_at,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration),
        )
    }
}

/// Issued session token returned on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub role: Role,
    pub redirect_to: String,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Issues, validates and revokes session tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Issue a token for an account whose credentials were just verified
    pub fn issue_token(&self, account: &account::Model) -> Result<IssuedToken, AuthError> {
        let role = account.role().ok_or_else(|| {
            AuthError::TokenCreation(format!("account {} has unknown role", account.id))
        })?;

        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        counter!("laundry_auth.tokens_issued", 1);

        Ok(IssuedToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs() as i64,
            role,
            redirect_to: role.dashboard_path().to_string(),
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Resolve the caller from request headers
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        let claims = self.validate_token(token).await?;
        AuthUser::try_from(claims)
    }

    /// Revoke a session until its natural expiry
    pub async fn revoke(&self, user: &AuthUser) {
        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken {
            jti: user.token_id.clone(),
            expiry: user.expires_at,
        });
        Self::clean_blacklist(&mut blacklist);
        counter!("laundry_auth.tokens_revoked", 1);
        debug!(account_id = user.account_id, "session token revoked");
    }

    /// Revoke a raw token (validated first)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        let user = AuthUser::try_from(claims)?;
        self.revoke(&user).await;
        Ok(())
    }

    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    fn clean_blacklist(blacklist: &mut Vec<BlacklistedToken>) {
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Insufficient role")]
    InsufficientRole,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken | Self::TokenExpired | Self::RevokedToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientRole => StatusCode::FORBIDDEN,
            Self::TokenCreation(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn response_message(&self) -> &'static str {
        match self {
            Self::MissingToken => "Please log in to continue",
            Self::InvalidToken => "Invalid authentication token",
            Self::TokenExpired => "Session has expired, please log in again",
            Self::RevokedToken => "Session has ended, please log in again",
            Self::InsufficientRole => "You do not have access to this page",
            Self::TokenCreation(_) | Self::InternalError(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let redirect_to = if status.is_server_error() {
            tracing::error!(error = %self, "authentication failure");
            None
        } else {
            counter!("laundry_auth.rejections", 1);
            Some(LOGIN_ENTRY.to_string())
        };

        let body = ErrorResponse::new(status, self.response_message().to_string(), redirect_to);
        (status, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Role middleware: the caller's role must be one of `allowed`
pub async fn role_middleware(
    State(allowed): State<Arc<[Role]>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    if !user.has_any_role(&allowed) {
        warn!(
            account_id = user.account_id,
            role = %user.role,
            path = %request.uri().path(),
            "role gate rejected request"
        );
        return Err(AuthError::InsufficientRole);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match auth_service.authenticate_headers(request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
    fn with_roles(self, roles: &[Role]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.route_layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.with_roles(&[role])
    }

    fn with_roles(self, roles: &[Role]) -> Self {
        let allowed: Arc<[Role]> = roles.into();
        self.route_layer(axum::middleware::from_fn_with_state(
            allowed,
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit-test-secret-that-is-long-enough-0123".to_string(),
            "laundry-api".to_string(),
            "laundry-auth".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn account(role: &str) -> account::Model {
        account::Model {
            id: 7,
            username: "juan".to_string(),
            password_hash: "$argon2id$unused".to_string(),
            role: role.to_string(),
            address: None,
            created_at: Utc::now(),
        }
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn issued_token_carries_identity_and_dashboard() {
        let auth = service();
        let issued = auth.issue_token(&account("staff")).unwrap();
        assert_eq!(issued.role, Role::Staff);
        assert_eq!(issued.redirect_to, "/dashboard/staff");

        let user = auth
            .authenticate_headers(&headers_with(&issued.access_token))
            .await
            .unwrap();
        assert_eq!(user.account_id, 7);
        assert_eq!(user.username, "juan");
        assert!(user.has_any_role(&[Role::Staff]));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = service();
        let issued = auth.issue_token(&account("customer")).unwrap();
        auth.revoke_token(&issued.access_token).await.unwrap();

        assert_matches!(
            auth.validate_token(&issued.access_token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_invalid() {
        let issued = service().issue_token(&account("admin")).unwrap();
        let other = AuthService::new(AuthConfig::new(
            "a-completely-different-secret-value-9876".to_string(),
            "laundry-api".to_string(),
            "laundry-auth".to_string(),
            Duration::from_secs(3600),
        ));
        assert_matches!(
            other.validate_token(&issued.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_missing_token() {
        let auth = service();
        assert_matches!(
            auth.authenticate_headers(&HeaderMap::new()).await,
            Err(AuthError::MissingToken)
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_matches!(
            auth.authenticate_headers(&headers).await,
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn unknown_role_cannot_be_issued_a_token() {
        assert_matches!(
            service().issue_token(&account("manager")),
            Err(AuthError::TokenCreation(_))
        );
    }

    #[test]
    fn gate_rejections_map_to_401_and_403() {
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::RevokedToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InsufficientRole.status_code(), StatusCode::FORBIDDEN);
    }
}
