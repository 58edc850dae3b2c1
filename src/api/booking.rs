use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::{AppJson, AppQuery};
use super::gate;
use crate::auth::AuthUser;
use crate::domain::DomainError;
use crate::domain::policy::{Action, Resource};
use crate::infrastructure::AppState;
use crate::models::booking::BookingView;
use crate::services::booking_service::{self, BookingFilter, BookingInput, BookingPatch};
use crate::services::local_now;

const DEFAULT_PARTY_SIZE: i32 = 2;

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
    pub guests: Option<String>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(filter): AppQuery<BookingFilter>,
) -> Result<Json<Vec<BookingView>>, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::List)?;
    let bookings =
        booking_service::list_bookings(state.db(), &user, scope, filter, local_now()).await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<BookingView>, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::Retrieve)?;
    Ok(Json(
        booking_service::get_booking(state.db(), &user, scope, id, local_now()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/bookings/",
    responses(
        (status = 201, description = "Booking created"),
        (status = 400, description = "Invalid input, capacity exceeded or slot already booked"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = []))
)]
pub async fn create_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<BookingInput>,
) -> Result<impl IntoResponse, DomainError> {
    gate(Some(&user), Resource::Booking, Action::Create)?;
    let booking = booking_service::create_booking(state.db(), &user, input, local_now()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn replace_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(input): AppJson<BookingInput>,
) -> Result<Json<BookingView>, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::Update)?;
    Ok(Json(
        booking_service::update_booking(state.db(), &user, scope, id, input.into(), local_now())
            .await?,
    ))
}

pub async fn patch_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    AppJson(patch): AppJson<BookingPatch>,
) -> Result<Json<BookingView>, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::Update)?;
    Ok(Json(
        booking_service::update_booking(state.db(), &user, scope, id, patch, local_now()).await?,
    ))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::Delete)?;
    booking_service::delete_booking(state.db(), &user, scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<BookingView>, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::Cancel)?;
    Ok(Json(
        booking_service::cancel_booking(state.db(), &user, scope, id, local_now()).await?,
    ))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<BookingView>, DomainError> {
    let scope = gate(Some(&user), Resource::Booking, Action::Confirm)?;
    Ok(Json(
        booking_service::confirm_booking(state.db(), &user, scope, id, local_now()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/bookings/available-slots/",
    params(
        ("date" = String, Query, description = "YYYY-MM-DD"),
        ("guests" = Option<i32>, Query, description = "Party size, defaults to 2")
    ),
    responses(
        (status = 200, description = "Slots with at least one suitable free table"),
        (status = 400, description = "Missing or malformed date/guests")
    ),
    security(("bearer" = []))
)]
pub async fn available_slots(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<SlotsQuery>,
) -> Result<Json<Value>, DomainError> {
    gate(Some(&user), Resource::Booking, Action::List)?;

    let raw_date = query
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| DomainError::validation("Date parameter is required."))?;
    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d").map_err(|_| {
        DomainError::validation("Invalid date format. Use YYYY-MM-DD.")
    })?;
    let guests = match query.guests.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_PARTY_SIZE,
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| DomainError::validation("Invalid number of guests."))?,
    };

    let slots = booking_service::available_slots(state.db(), date, guests, local_now()).await?;
    Ok(Json(json!({
        "date": date,
        "guests": guests,
        "available_slots": slots
    })))
}
