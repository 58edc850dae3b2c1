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
use crate::models::menu_item::MenuItemView;
use crate::services::catalog_service::{self, MenuItemFilter, MenuItemInput, MenuItemPatch};

/// Public menu listing; a token is optional here.
#[utoipa::path(
    get,
    path = "/api/menu-items/",
    params(
        ("category" = Option<i32>, Query, description = "Category id"),
        ("is_available" = Option<bool>, Query, description = "Availability flag"),
        ("search" = Option<String>, Query, description = "Name or description fragment"),
        ("ordering" = Option<String>, Query, description = "name, price or category; '-' for descending")
    ),
    responses(
        (status = 200, description = "Menu items")
    )
)]
pub async fn list_menu_items(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    AppQuery(filter): AppQuery<MenuItemFilter>,
) -> Result<Json<Vec<MenuItemView>>, DomainError> {
    gate(user.as_ref().map(|u| &u.0), Resource::MenuItem, Action::List)?;
    Ok(Json(catalog_service::list_menu_items(state.db(), filter).await?))
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<MenuItemView>, DomainError> {
    gate(user.as_ref().map(|u| &u.0), Resource::MenuItem, Action::Retrieve)?;
    Ok(Json(catalog_service::get_menu_item(state.db(), id).await?))
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<MenuItemInput>,
) -> Result<impl IntoResponse, DomainError> {
    gate(Some(&user), Resource::MenuItem, Action::Create)?;
    let item = catalog_service::create_menu_item(state.db(), input).await?;
    tracing::info!("Menu item #{} created by {}", item.id, user.username);
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn replace_menu_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(input): AppJson<MenuItemInput>,
) -> Result<Json<MenuItemView>, DomainError> {
    gate(Some(&user), Resource::MenuItem, Action::Update)?;
    Ok(Json(
        catalog_service::update_menu_item(state.db(), id, input.into()).await?,
    ))
}

pub async fn patch_menu_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(patch): AppJson<MenuItemPatch>,
) -> Result<Json<MenuItemView>, DomainError> {
    gate(Some(&user), Resource::MenuItem, Action::Update)?;
    Ok(Json(catalog_service::update_menu_item(state.db(), id, patch).await?))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, DomainError> {
    gate(Some(&user), Resource::MenuItem, Action::Delete)?;
    catalog_service::delete_menu_item(state.db(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
