use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

use super::error::AppJson;
use crate::auth::AuthUser;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::user::UserProfile;
use crate::services::auth_service::{self, LoginInput, RegisterInput};

#[utoipa::path(
    post,
    path = "/api/auth/register/",
    responses(
        (status = 201, description = "Account created, returns user and token"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterInput>,
) -> Result<impl IntoResponse, DomainError> {
    let user = auth_service::register(state.db(), input).await?;
    let token = auth_service::issue_token(&state.config, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": UserProfile::from(user),
            "token": token
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login/",
    responses(
        (status = 200, description = "Token and user"),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginInput>,
) -> Result<Json<Value>, DomainError> {
    let user = auth_service::authenticate(state.db(), input).await?;
    let token = auth_service::issue_token(&state.config, &user)?;

    Ok(Json(json!({
        "token": token,
        "user": UserProfile::from(user)
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, DomainError> {
    auth_service::logout(state.db(), user).await?;
    Ok(Json(json!({ "message": "Successfully logged out." })))
}

pub async fn profile(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(user))
}
