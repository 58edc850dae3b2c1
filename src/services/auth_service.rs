//! Auth Service - registration, login and token revocation

use sea_orm::*;
use serde::Deserialize;

use super::{looks_like_email, now_timestamp};
use crate::domain::DomainError;
use crate::domain::errors::is_unique_violation;
use crate::infrastructure::auth::{create_jwt, hash_password, verify_password};
use crate::infrastructure::config::Config;
use crate::models::user::{self, Entity as User};

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "admin123", "letmein1", "trustno1", "abc12345",
    "passw0rd", "11111111", "00000000", "monkey123", "dragon123", "starwars",
];

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

fn check_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::field("username", "This field may not be blank."));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(DomainError::field(
            "username",
            format!(
                "Ensure this field has no more than {} characters.",
                USERNAME_MAX_LEN
            ),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        return Err(DomainError::field(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

fn check_password(input: &RegisterInput) -> Result<(), DomainError> {
    if input.password != input.password2 {
        return Err(DomainError::field(
            "password",
            "Password fields didn't match.",
        ));
    }
    let password = input.password.as_str();
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(DomainError::field(
            "password",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LEN
            ),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::field(
            "password",
            "This password is entirely numeric.",
        ));
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(DomainError::field("password", "This password is too common."));
    }
    if password.eq_ignore_ascii_case(&input.username) {
        return Err(DomainError::field(
            "password",
            "The password is too similar to the username.",
        ));
    }
    Ok(())
}

pub fn issue_token(config: &Config, user: &user::Model) -> Result<String, DomainError> {
    create_jwt(user, &config.jwt_secret, config.token_ttl_hours).map_err(DomainError::Internal)
}

/// Create a customer account.
pub async fn register(
    db: &DatabaseConnection,
    input: RegisterInput,
) -> Result<user::Model, DomainError> {
    let username = input.username.trim().to_string();
    check_username(&username)?;
    if !looks_like_email(input.email.trim()) {
        return Err(DomainError::field("email", "Enter a valid email address."));
    }
    check_password(&input)?;

    let taken = User::find()
        .filter(user::Column::Username.eq(&username))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(DomainError::field(
            "username",
            "A user with that username already exists.",
        ));
    }

    let password_hash = hash_password(&input.password).map_err(DomainError::Internal)?;
    let timestamp = now_timestamp();

    let user = user::ActiveModel {
        username: Set(username),
        email: Set(input.email.trim().to_string()),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        password_hash: Set(password_hash),
        is_staff: Set(false),
        token_version: Set(0),
        created_at: Set(timestamp.clone()),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DomainError::field("username", "A user with that username already exists.")
        } else {
            e.into()
        }
    })?;

    tracing::info!("Registered user: {}", user.username);
    Ok(user)
}

/// Check a username/password pair. Unknown user and wrong password are
/// indistinguishable to the caller.
pub async fn authenticate(
    db: &DatabaseConnection,
    input: LoginInput,
) -> Result<user::Model, DomainError> {
    let Some(user) = User::find()
        .filter(user::Column::Username.eq(&input.username))
        .one(db)
        .await?
    else {
        tracing::warn!("Login failed, unknown user: {}", input.username);
        return Err(DomainError::InvalidCredentials);
    };

    match verify_password(&input.password, &user.password_hash) {
        Ok(true) => {
            tracing::info!("Login succeeded for user: {}", user.username);
            Ok(user)
        }
        Ok(false) => {
            tracing::warn!("Login failed, wrong password for user: {}", user.username);
            Err(DomainError::InvalidCredentials)
        }
        Err(e) => {
            tracing::error!("Stored hash unreadable for user {}: {}", user.username, e);
            Err(DomainError::InvalidCredentials)
        }
    }
}

/// Revoke every token issued to `user` so far.
pub async fn logout(db: &DatabaseConnection, user: user::Model) -> Result<(), DomainError> {
    let username = user.username.clone();
    let next_version = user.token_version + 1;

    let mut active: user::ActiveModel = user.into();
    active.token_version = Set(next_version);
    active.updated_at = Set(now_timestamp());

    active.update(db).await.map(|_| ()).map_err(|e| {
        tracing::error!("Logout failed for {}: {}", username, e);
        DomainError::validation("Error during logout.")
    })?;

    tracing::info!("Logged out user: {}", username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(username: &str, password: &str, password2: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: "x@example.com".to_string(),
            password: password.to_string(),
            password2: password2.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn test_password_rules() {
        assert!(check_password(&input("ana", "Lemon-Tree-42", "Lemon-Tree-42")).is_ok());
        assert!(check_password(&input("ana", "Lemon-Tree-42", "Lemon-Tree-43")).is_err());
        assert!(check_password(&input("ana", "short1", "short1")).is_err());
        assert!(check_password(&input("ana", "1234509876", "1234509876")).is_err());
        assert!(check_password(&input("ana", "Password123", "Password123")).is_err());
        assert!(check_password(&input("ana_lemon1", "ana_lemon1", "ana_lemon1")).is_err());
    }

    #[test]
    fn test_username_rules() {
        assert!(check_username("ana.m+1@x").is_ok());
        assert!(check_username("").is_err());
        assert!(check_username("has space").is_err());
        assert!(check_username(&"a".repeat(151)).is_err());
    }
}
