use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::user;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub uid: i32,
    pub staff: bool,
    /// Must match the user's current token_version
    pub ver: i32,
    pub exp: usize,
}

impl Claims {
    pub fn for_user(user: &user::Model, ttl_hours: i64) -> Result<Self, String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(ttl_hours))
            .ok_or_else(|| "token expiry out of range".to_string())?
            .timestamp();

        Ok(Self {
            sub: user.username.clone(),
            uid: user.id,
            staff: user.is_staff,
            ver: user.token_version,
            exp: expiration as usize,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_jwt(user: &user::Model, secret: &str, ttl_hours: i64) -> Result<String, String> {
    let claims = Claims::for_user(user, ttl_hours)?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// The authenticated caller, loaded fresh from the database on every request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = DomainError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                DomainError::Unauthorized(
                    "Authentication credentials were not provided.".to_string(),
                )
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            DomainError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let claims = decode_jwt(token, &state.config.jwt_secret).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            DomainError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let user = user::Entity::find_by_id(claims.uid)
            .one(state.db())
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Invalid or expired token".to_string()))?;

        if user.token_version != claims.ver {
            tracing::warn!("Revoked token presented for user: {}", user.username);
            return Err(DomainError::Unauthorized(
                "Invalid or expired token".to_string(),
            ));
        }

        Ok(AuthUser(user))
    }
}
