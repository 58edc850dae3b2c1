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
use crate::models::restaurant_table;
use crate::services::table_service::{self, TableFilter, TableInput, TablePatch};

pub async fn list_tables(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(filter): AppQuery<TableFilter>,
) -> Result<Json<Vec<restaurant_table::Model>>, DomainError> {
    gate(Some(&user), Resource::Table, Action::List)?;
    Ok(Json(table_service::list_tables(state.db(), filter).await?))
}

pub async fn get_table(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<restaurant_table::Model>, DomainError> {
    gate(Some(&user), Resource::Table, Action::Retrieve)?;
    Ok(Json(table_service::get_table(state.db(), id).await?))
}

pub async fn create_table(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<TableInput>,
) -> Result<impl IntoResponse, DomainError> {
    gate(Some(&user), Resource::Table, Action::Create)?;
    let table = table_service::create_table(state.db(), input).await?;
    tracing::info!("Table {} created by {}", table.number, user.username);
    Ok((StatusCode::CREATED, Json(table)))
}

pub async fn replace_table(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(input): AppJson<TableInput>,
) -> Result<Json<restaurant_table::Model>, DomainError> {
    gate(Some(&user), Resource::Table, Action::Update)?;
    Ok(Json(
        table_service::update_table(state.db(), id, input.into()).await?,
    ))
}

pub async fn patch_table(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(patch): AppJson<TablePatch>,
) -> Result<Json<restaurant_table::Model>, DomainError> {
    gate(Some(&user), Resource::Table, Action::Update)?;
    Ok(Json(table_service::update_table(state.db(), id, patch).await?))
}

pub async fn delete_table(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, DomainError> {
    gate(Some(&user), Resource::Table, Action::Delete)?;
    table_service::delete_table(state.db(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
