use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::error::{AppJson, AppQuery};
use super::gate;
use crate::auth::AuthUser;
use crate::domain::DomainError;
use crate::domain::policy::{Action, Resource};
use crate::infrastructure::AppState;
use crate::models::category::CategoryView;
use crate::services::catalog_service::{self, CategoryFilter, CategoryInput, CategoryPatch};

pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(filter): AppQuery<CategoryFilter>,
) -> Result<Json<Vec<CategoryView>>, DomainError> {
    gate(Some(&user), Resource::Category, Action::List)?;
    Ok(Json(catalog_service::list_categories(state.db(), filter).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<CategoryView>, DomainError> {
    gate(Some(&user), Resource::Category, Action::Retrieve)?;
    Ok(Json(catalog_service::get_category(state.db(), id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<impl IntoResponse, DomainError> {
    gate(Some(&user), Resource::Category, Action::Create)?;
    let category = catalog_service::create_category(state.db(), input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn replace_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<Json<CategoryView>, DomainError> {
    gate(Some(&user), Resource::Category, Action::Update)?;
    Ok(Json(
        catalog_service::update_category(state.db(), id, input.into()).await?,
    ))
}

pub async fn patch_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(patch): AppJson<CategoryPatch>,
) -> Result<Json<CategoryView>, DomainError> {
    gate(Some(&user), Resource::Category, Action::Update)?;
    Ok(Json(catalog_service::update_category(state.db(), id, patch).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, DomainError> {
    gate(Some(&user), Resource::Category, Action::Delete)?;
    catalog_service::delete_category(state.db(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
