use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::error::{AppJson, AppQuery};
use super::gate;
use crate::auth::AuthUser;
use crate::domain::DomainError;
use crate::domain::policy::{Action, Resource};
use crate::infrastructure::AppState;
use crate::models::order::OrderView;
use crate::services::order_service::{
    self, LineInput, OrderFilter, OrderInput, OrderPatch, QuantityInput,
};

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: Option<String>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(filter): AppQuery<OrderFilter>,
) -> Result<Json<Vec<OrderView>>, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::List)?;
    Ok(Json(
        order_service::list_orders(state.db(), &user, scope, filter).await?,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<OrderView>, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::Retrieve)?;
    Ok(Json(order_service::get_order(state.db(), &user, scope, id).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<OrderInput>,
) -> Result<impl IntoResponse, DomainError> {
    gate(Some(&user), Resource::Order, Action::Create)?;
    let order = order_service::create_order(state.db(), &user, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// PUT and PATCH share this handler: only `booking` and
/// `special_instructions` are writable.
pub async fn update_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(patch): AppJson<OrderPatch>,
) -> Result<Json<OrderView>, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::Update)?;
    Ok(Json(
        order_service::update_order(state.db(), &user, scope, id, patch).await?,
    ))
}

pub async fn delete_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::Delete)?;
    order_service::delete_order(state.db(), &user, scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/update_status/",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its new status"),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Caller is not staff")
    ),
    security(("bearer" = []))
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(input): AppJson<StatusInput>,
) -> Result<Json<OrderView>, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::UpdateStatus)?;
    Ok(Json(
        order_service::update_status(state.db(), &user, scope, id, input.status.as_deref())
            .await?,
    ))
}

// Line items. Each mutation goes through the same re-pricing path and
// returns the whole order.

pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(line): AppJson<LineInput>,
) -> Result<impl IntoResponse, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::Update)?;
    let order = order_service::add_item(state.db(), &user, scope, id, line).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, item_id)): Path<(i32, i32)>,
    AppJson(input): AppJson<QuantityInput>,
) -> Result<Json<OrderView>, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::Update)?;
    Ok(Json(
        order_service::update_item(state.db(), &user, scope, id, item_id, input.quantity)
            .await?,
    ))
}

pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, item_id)): Path<(i32, i32)>,
) -> Result<Json<OrderView>, DomainError> {
    let scope = gate(Some(&user), Resource::Order, Action::Update)?;
    Ok(Json(
        order_service::remove_item(state.db(), &user, scope, id, item_id).await?,
    ))
}
