/*!
 * # Authentication and Authorization Module
 *
 * Session handling for the storefront and the admin back-office.
 * Customers authenticate with email/password; a signed JWT is issued
 * and carried either in an HttpOnly `session` cookie (browser flows)
 * or an `Authorization: Bearer` header (API clients).
 *
 * Passwords are hashed with Argon2id. Role checks distinguish plain
 * customers from admin users.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::entities::customer::{self, Role};

pub const SESSION_COOKIE: &str = "session";

const JWT_ISSUER: &str = "storefront-api";
const JWT_AUDIENCE: &str = "storefront";

/// Claim structure for session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (customer ID)
    pub email: String, // Customer's email
    pub role: String,  // "admin" or "customer"
    pub jti: String,   // Unique token identifier
    pub iat: i64,      // Issued at time
    pub exp: i64,      // Expiration time
    pub iss: String,   // Issuer
    pub aud: String,   // Audience
}

/// Authenticated session data extracted from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub customer_id: Uuid,
    pub email: String,
    pub role: Role,
    pub token_id: String,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub session_secret: String,
    pub session_ttl_secs: u64,
}

impl AuthConfig {
    pub fn new(session_secret: impl Into<String>, session_ttl_secs: u64) -> Self {
        Self {
            session_secret: session_secret.into(),
            session_ttl_secs,
        }
    }
}

/// Authentication service that handles password hashing and token
/// issuance and validation
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Hash a plaintext password with Argon2id
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash
    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Issue a session token for a customer
    pub fn issue_token(&self, customer: &customer::Model) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let exp = now + ChronoDuration::seconds(self.config.session_ttl_secs as i64);

        let claims = Claims {
            sub: customer.id.to_string(),
            email: customer.email.clone(),
            role: customer.role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: JWT_ISSUER.to_string(),
            aud: JWT_AUDIENCE.to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.session_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.config.session_ttl_secs as i64,
        })
    }

    /// Validate a session token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[JWT_AUDIENCE]);
        validation.set_issuer(&[JWT_ISSUER]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.session_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    /// Build the session for a validated token, rejecting deactivated accounts
    pub async fn session_from_claims(&self, claims: Claims) -> Result<AuthSession, AuthError> {
        let customer_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = Role::from_str(&claims.role).map_err(|_| AuthError::InvalidToken)?;

        let account = customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidToken)?;
        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(AuthSession {
            customer_id,
            email: claims.email,
            role,
            token_id: claims.jti,
        })
    }

    /// Check credentials and return the matching active account
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<customer::Model, AuthError> {
        let account = customer::Entity::find()
            .filter(customer::Column::Email.eq(email.to_lowercase()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(account)
    }

    /// Register a new customer account
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<customer::Model, AuthError> {
        let email = email.to_lowercase();

        let existing = customer::Entity::find()
            .filter(customer::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let account = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(self.hash_password(password)?),
            name: Set(name.to_string()),
            role: Set(Role::Customer),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = account
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        debug!(customer_id = %created.id, "registered customer account");
        Ok(created)
    }
}

/// Issued session token response
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session has expired")]
    TokenExpired,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Email address is already registered")]
    EmailTaken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid session token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Session has expired".to_string(),
            ),
            Self::AccountDeactivated => (
                StatusCode::FORBIDDEN,
                "AUTH_ACCOUNT_DEACTIVATED",
                "Account is deactivated".to_string(),
            ),
            Self::EmailTaken => (
                StatusCode::CONFLICT,
                "AUTH_EMAIL_TAKEN",
                "Email address is already registered".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Failed to create session token".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal authentication error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for crate::errors::ApiError {
    fn from(err: AuthError) -> Self {
        use crate::errors::{ApiError, ServiceError};
        match err {
            AuthError::EmailTaken => ApiError::ServiceError(ServiceError::Conflict(
                "An account with this email already exists".to_string(),
            )),
            AuthError::MissingAuth
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired => ApiError::Unauthorized,
            AuthError::AccountDeactivated | AuthError::InsufficientPermissions => {
                ApiError::ServiceError(ServiceError::Forbidden(err.to_string()))
            }
            AuthError::TokenCreation(_)
            | AuthError::DatabaseError(_)
            | AuthError::InternalError(_) => ApiError::InternalServerError,
        }
    }
}

/// Role middleware to check that the session carries the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = match request.extensions().get::<AuthSession>() {
        Some(session) => session.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    if session.role.to_string() != required_role {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates the session
/// token, then stores the session in request extensions
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_session_from_headers(&headers, &auth_service).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract the session from request headers. Bearer tokens take
/// precedence over the session cookie.
async fn extract_session_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthSession, AuthError> {
    if let Some(token) = bearer_token(headers).or_else(|| session_cookie(headers)) {
        let claims = auth_service.validate_token(&token)?;
        return auth_service.session_from_claims(claims).await;
    }

    Err(AuthError::MissingAuth)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig::new(
            "a-test-only-secret-with-plenty-of-unique-characters-0123456789abcdef",
            3600,
        )
    }

    fn test_service() -> AuthService {
        // Token and password operations never touch the connection.
        let db = Arc::new(DatabaseConnection::Disconnected);
        AuthService::new(test_config(), db)
    }

    fn test_account() -> customer::Model {
        let now = Utc::now();
        customer::Model {
            id: Uuid::new_v4(),
            email: "shopper@example.com".to_string(),
            password_hash: String::new(),
            name: "Shopper".to_string(),
            role: Role::Customer,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let service = test_service();
        let account = test_account();

        let issued = service.issue_token(&account).unwrap();
        let claims = service.validate_token(&issued.token).unwrap();

        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.email, account.email);
        assert_eq!(claims.role, "customer");
        assert_eq!(claims.iss, JWT_ISSUER);
        assert_eq!(claims.aud, JWT_AUDIENCE);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let service = test_service();
        let other = AuthService::new(
            AuthConfig::new(
                "another-secret-entirely-with-enough-unique-characters-zyxwvut987",
                3600,
            ),
            Arc::new(DatabaseConnection::Disconnected),
        );

        let issued = other.issue_token(&test_account()).unwrap();
        assert!(matches!(
            service.validate_token(&issued.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let service = test_service();
        let hash = service.hash_password("hunter2hunter2").unwrap();

        assert!(service.verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!service.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn session_cookie_is_parsed_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; session=abc.def.ghi; other=1".parse().unwrap(),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_takes_plain_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok123".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("tok123"));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
