//! User accounts, credentials, and bearer tokens.

use crate::error::{ApiError, ApiResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use coffre_core::config::BusinessConfig;
use coffre_core::validate::{validate_email, validate_password};
use coffre_metadata::models::{UserRole, UserRow, UserStatus};
use coffre_metadata::{MetadataError, MetadataStore};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Bearer token lifetime.
const TOKEN_TTL_SECS: i64 = 24 * 3600;

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> ApiResult<Uuid> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| ApiError::Unauthorized("malformed token subject".to_string()))
    }
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against its stored Argon2 hash.
pub fn verify_password(password: &str, stored: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(format!("stored password hash unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Registration / login service.
pub struct UserService {
    metadata: Arc<dyn MetadataStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    business: BusinessConfig,
}

/// A successful authentication: the token plus the account it names.
pub struct AuthOutcome {
    pub token: String,
    pub user: UserRow,
}

impl UserService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        jwt_secret: &str,
        business: BusinessConfig,
    ) -> Self {
        Self {
            metadata,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            business,
        }
    }

    /// Register a new account. The first registered user is the admin.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        invite_code: Option<&str>,
    ) -> ApiResult<AuthOutcome> {
        if !self.business.registration_enabled {
            return Err(ApiError::Forbidden("registration is disabled".to_string()));
        }
        if let Some(required) = self.business.invite_code.as_deref() {
            if invite_code != Some(required) {
                return Err(ApiError::InvalidInput("invalid invite code".to_string()));
            }
        }

        validate_email(email)?;
        validate_password(password)?;

        let role = if self.metadata.count_users().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let now = OffsetDateTime::now_utc();
        let user = UserRow {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role: role.as_str().to_string(),
            status: UserStatus::Active.as_str().to_string(),
            storage_quota: self.business.default_user_quota as i64,
            storage_used: 0,
            created_at: now,
            updated_at: now,
        };

        match self.metadata.create_user(&user).await {
            Ok(()) => {}
            Err(MetadataError::AlreadyExists(_)) => {
                return Err(ApiError::InvalidInput(
                    "email already registered".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.user_id, role = %user.role, "user registered");
        let token = self.mint_token(&user)?;
        Ok(AuthOutcome { token, user })
    }

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthOutcome> {
        // One error for both unknown email and bad password, so login
        // probes cannot enumerate accounts.
        let denied = || ApiError::Unauthorized("invalid email or password".to_string());

        let user = self
            .metadata
            .get_user_by_email(email)
            .await?
            .ok_or_else(denied)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(denied());
        }
        if !user.is_active() {
            return Err(ApiError::Forbidden("account is disabled".to_string()));
        }

        let token = self.mint_token(&user)?;
        Ok(AuthOutcome { token, user })
    }

    /// Mint a bearer token for the user.
    pub fn mint_token(&self, user: &UserRow) -> ApiResult<String> {
        let claims = Claims {
            user_id: user.user_id.to_string(),
            email: user.email.clone(),
            is_admin: user.is_admin(),
            exp: (OffsetDateTime::now_utc().unix_timestamp()) + TOKEN_TTL_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("token minting failed: {e}")))
    }

    /// Verify a bearer token: the algorithm is pinned and expiry enforced.
    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))
    }

    /// Look up a user by id.
    pub async fn get_user_by_id(&self, user_id: Uuid) -> ApiResult<UserRow> {
        self.metadata
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))
    }
}
