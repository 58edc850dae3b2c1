//! Booking Service - reservations, conflict detection and slot availability
//!
//! Conflict policy: the advisory conflict check runs on creation only.
//! Edits never re-check other bookings in the application; the partial
//! unique index on (table, date, time_slot) still rejects a reschedule into
//! a held slot, and that rejection is reported as the same conflict error.

use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::{Ordering, looks_like_email, now_timestamp, search_term};
use crate::domain::errors::is_unique_violation;
use crate::domain::policy::{self, Action, Resource, Scope};
use crate::domain::schedule::{self, SlotAvailability};
use crate::domain::DomainError;
use crate::models::booking::{self, BookingView, Entity as Booking};
use crate::models::order::{self, Entity as Order};
use crate::models::restaurant_table::{self, Entity as Table};
use crate::models::user::{self, Entity as User};
use crate::models::{BookingStatus, TimeSlot};

pub const CONFLICT_MESSAGE: &str = "This table is already booked for the selected date and time.";

#[derive(Debug, Clone, Deserialize)]
pub struct BookingInput {
    pub table: i32,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub number_of_guests: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[serde(default)]
    pub special_requests: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BookingPatch {
    pub table: Option<i32>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
    pub number_of_guests: Option<i32>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub special_requests: Option<String>,
}

impl From<BookingInput> for BookingPatch {
    fn from(input: BookingInput) -> Self {
        Self {
            table: Some(input.table),
            date: Some(input.date),
            time_slot: Some(input.time_slot),
            number_of_guests: Some(input.number_of_guests),
            customer_name: Some(input.customer_name),
            customer_email: Some(input.customer_email),
            customer_phone: Some(input.customer_phone),
            special_requests: Some(input.special_requests),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
    pub table: Option<i32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::field(field, "This field may not be blank."));
    }
    if value.chars().count() > max {
        return Err(DomainError::field(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        ));
    }
    Ok(())
}

fn check_contact(name: &str, email: &str, phone: &str) -> Result<(), DomainError> {
    check_text("customer_name", name, 100)?;
    if !looks_like_email(email) {
        return Err(DomainError::field(
            "customer_email",
            "Enter a valid email address.",
        ));
    }
    check_text("customer_phone", phone, 15)?;
    Ok(())
}

async fn find_table<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<restaurant_table::Model, DomainError> {
    Table::find_by_id(id).one(db).await?.ok_or_else(|| {
        DomainError::field(
            "table",
            format!("Invalid pk \"{}\" - object does not exist.", id),
        )
    })
}

fn booking_write_error(e: DbErr) -> DomainError {
    if is_unique_violation(&e) {
        tracing::warn!("Booking rejected by slot uniqueness constraint");
        DomainError::Conflict(CONFLICT_MESSAGE.to_string())
    } else {
        e.into()
    }
}

/// Insert a booking row. A uniqueness rejection (a concurrent request won the
/// slot after our pre-check) surfaces as a conflict.
async fn insert_booking<C: ConnectionTrait>(
    db: &C,
    active: booking::ActiveModel,
) -> Result<booking::Model, DomainError> {
    active.insert(db).await.map_err(booking_write_error)
}

/// Bookings still holding a table in the given slot at `now`.
async fn active_bookings_in_slot<C: ConnectionTrait>(
    db: &C,
    table_id: i32,
    date: NaiveDate,
    slot: TimeSlot,
    now: NaiveDateTime,
) -> Result<Vec<booking::Model>, DomainError> {
    let rows = Booking::find()
        .filter(booking::Column::TableId.eq(table_id))
        .filter(booking::Column::Date.eq(date))
        .filter(booking::Column::TimeSlot.eq(slot))
        .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE))
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter(|b| b.effective_status(now).is_active())
        .collect())
}

async fn build_views<C: ConnectionTrait>(
    db: &C,
    bookings: Vec<booking::Model>,
    now: NaiveDateTime,
) -> Result<Vec<BookingView>, DomainError> {
    let user_ids: HashSet<i32> = bookings.iter().map(|b| b.user_id).collect();
    let table_ids: HashSet<i32> = bookings.iter().map(|b| b.table_id).collect();

    let users: HashMap<i32, String> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect()
    };

    let tables: HashMap<i32, restaurant_table::Model> = if table_ids.is_empty() {
        HashMap::new()
    } else {
        Table::find()
            .filter(restaurant_table::Column::Id.is_in(table_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
    };

    bookings
        .into_iter()
        .map(|b| {
            let table = tables
                .get(&b.table_id)
                .ok_or_else(|| DomainError::Internal(format!("booking #{} lost its table", b.id)))?;
            let user_name = users.get(&b.user_id).cloned().unwrap_or_default();
            Ok(BookingView::new(b, user_name, table, now))
        })
        .collect()
}

async fn single_view<C: ConnectionTrait>(
    db: &C,
    booking: booking::Model,
    now: NaiveDateTime,
) -> Result<BookingView, DomainError> {
    build_views(db, vec![booking], now)
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("empty booking view".to_string()))
}

/// Fetch a booking the caller may see under `scope`; anything else is
/// reported as missing.
pub(crate) async fn find_visible<C: ConnectionTrait>(
    db: &C,
    caller: &user::Model,
    scope: Scope,
    id: i32,
) -> Result<booking::Model, DomainError> {
    Booking::find_by_id(id)
        .one(db)
        .await?
        .filter(|b| policy::can_see(scope, caller.id, b.user_id))
        .ok_or(DomainError::NotFound("Booking"))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub async fn list_bookings(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    filter: BookingFilter,
    now: NaiveDateTime,
) -> Result<Vec<BookingView>, DomainError> {
    let mut query = Booking::find();

    if scope == Scope::Own {
        query = query.filter(booking::Column::UserId.eq(caller.id));
    }
    if let Some(date) = filter.date {
        query = query.filter(booking::Column::Date.eq(date));
    }
    if let Some(table_id) = filter.table {
        query = query.filter(booking::Column::TableId.eq(table_id));
    }
    if let Some(q) = search_term(&filter.search) {
        query = query.filter(
            Condition::any()
                .add(booking::Column::CustomerName.contains(q))
                .add(booking::Column::CustomerEmail.contains(q))
                .add(booking::Column::CustomerPhone.contains(q)),
        );
    }

    query = match Ordering::parse(filter.ordering.as_deref()) {
        Some(o) if o.field == "date" => query.order_by(booking::Column::Date, o.direction()),
        Some(o) if o.field == "time_slot" => {
            query.order_by(booking::Column::TimeSlot, o.direction())
        }
        Some(o) if o.field == "created_at" => {
            query.order_by(booking::Column::CreatedAt, o.direction())
        }
        _ => query
            .order_by_desc(booking::Column::Date)
            .order_by_desc(booking::Column::TimeSlot),
    };

    let bookings = query.all(db).await?;

    // Status is derived at read time, so the filter runs after derivation
    let bookings: Vec<booking::Model> = match filter.status {
        Some(wanted) => bookings
            .into_iter()
            .filter(|b| b.effective_status(now) == wanted)
            .collect(),
        None => bookings,
    };

    build_views(db, bookings, now).await
}

pub async fn get_booking(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
    now: NaiveDateTime,
) -> Result<BookingView, DomainError> {
    let booking = find_visible(db, caller, scope, id).await?;
    single_view(db, booking, now).await
}

/// Create a booking for `caller`.
///
/// Checks run in order: field validation, table capacity, then the advisory
/// slot conflict check. The new booking starts pending (or completed if its
/// slot has already started).
pub async fn create_booking(
    db: &DatabaseConnection,
    caller: &user::Model,
    input: BookingInput,
    now: NaiveDateTime,
) -> Result<BookingView, DomainError> {
    schedule::check_guest_count(input.number_of_guests)?;
    check_contact(
        &input.customer_name,
        &input.customer_email,
        &input.customer_phone,
    )?;

    let table = find_table(db, input.table).await?;
    schedule::check_capacity(input.number_of_guests, table.capacity)?;

    let held = active_bookings_in_slot(db, table.id, input.date, input.time_slot, now).await?;
    if !held.is_empty() {
        tracing::warn!(
            "Slot conflict: table {} on {} at {}",
            table.number,
            input.date,
            input.time_slot.as_str()
        );
        return Err(DomainError::Conflict(CONFLICT_MESSAGE.to_string()));
    }

    let status = schedule::effective_status(BookingStatus::Pending, input.date, input.time_slot, now);
    let timestamp = now_timestamp();

    let saved = insert_booking(
        db,
        booking::ActiveModel {
            user_id: Set(caller.id),
            table_id: Set(table.id),
            date: Set(input.date),
            time_slot: Set(input.time_slot),
            number_of_guests: Set(input.number_of_guests),
            customer_name: Set(input.customer_name.trim().to_string()),
            customer_email: Set(input.customer_email.trim().to_string()),
            customer_phone: Set(input.customer_phone.trim().to_string()),
            special_requests: Set(input.special_requests),
            status: Set(status),
            created_at: Set(timestamp.clone()),
            updated_at: Set(timestamp),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(
        "Booking #{} created by {} for table {} on {} at {}",
        saved.id,
        caller.username,
        table.number,
        saved.date,
        saved.time_slot.as_str()
    );
    single_view(db, saved, now).await
}

/// Edit a booking. Capacity is re-validated; the slot conflict pre-check is
/// deliberately not repeated here.
pub async fn update_booking(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
    patch: BookingPatch,
    now: NaiveDateTime,
) -> Result<BookingView, DomainError> {
    let existing = find_visible(db, caller, scope, id).await?;

    let guests = patch.number_of_guests.unwrap_or(existing.number_of_guests);
    let name = patch
        .customer_name
        .clone()
        .unwrap_or_else(|| existing.customer_name.clone());
    let email = patch
        .customer_email
        .clone()
        .unwrap_or_else(|| existing.customer_email.clone());
    let phone = patch
        .customer_phone
        .clone()
        .unwrap_or_else(|| existing.customer_phone.clone());

    schedule::check_guest_count(guests)?;
    check_contact(&name, &email, &phone)?;

    let table = find_table(db, patch.table.unwrap_or(existing.table_id)).await?;
    schedule::check_capacity(guests, table.capacity)?;

    let date = patch.date.unwrap_or(existing.date);
    let slot = patch.time_slot.unwrap_or(existing.time_slot);
    let status = schedule::effective_status(existing.status, date, slot, now);

    let mut active: booking::ActiveModel = existing.into();
    active.table_id = Set(table.id);
    active.date = Set(date);
    active.time_slot = Set(slot);
    active.number_of_guests = Set(guests);
    active.customer_name = Set(name.trim().to_string());
    active.customer_email = Set(email.trim().to_string());
    active.customer_phone = Set(phone.trim().to_string());
    if let Some(requests) = patch.special_requests {
        active.special_requests = Set(requests);
    }
    active.status = Set(status);
    active.updated_at = Set(now_timestamp());

    let saved = active.update(db).await.map_err(booking_write_error)?;
    tracing::info!("Booking #{} updated by {}", saved.id, caller.username);
    single_view(db, saved, now).await
}

async fn set_status(
    db: &DatabaseConnection,
    booking: booking::Model,
    status: BookingStatus,
) -> Result<booking::Model, DomainError> {
    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(status);
    active.updated_at = Set(now_timestamp());
    active.update(db).await.map_err(booking_write_error)
}

/// Cancel a booking. Only its owner or a staff member may cancel, and only
/// while it is still pending or confirmed.
pub async fn cancel_booking(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
    now: NaiveDateTime,
) -> Result<BookingView, DomainError> {
    let booking = find_visible(db, caller, scope, id).await?;
    policy::ensure_owner_or_staff(Resource::Booking, Action::Cancel, caller, booking.user_id)?;

    let current = booking.effective_status(now);
    if current != booking.status {
        // Persist the derived completion before refusing
        set_status(db, booking.clone(), current).await?;
    }
    schedule::ensure_cancellable(current)?;

    let saved = set_status(db, booking, BookingStatus::Cancelled).await?;
    tracing::info!("Booking #{} cancelled by {}", saved.id, caller.username);
    single_view(db, saved, now).await
}

/// Staff acknowledgement of a pending booking.
pub async fn confirm_booking(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
    now: NaiveDateTime,
) -> Result<BookingView, DomainError> {
    let booking = find_visible(db, caller, scope, id).await?;
    schedule::ensure_confirmable(booking.effective_status(now))?;

    let saved = set_status(db, booking, BookingStatus::Confirmed).await?;
    tracing::info!("Booking #{} confirmed by {}", saved.id, caller.username);
    single_view(db, saved, now).await
}

/// Delete a booking. Orders pointing at it are kept and lose the reference.
pub async fn delete_booking(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    let booking = find_visible(&txn, caller, scope, id).await?;

    Order::update_many()
        .col_expr(order::Column::BookingId, Expr::value(Option::<i32>::None))
        .filter(order::Column::BookingId.eq(booking.id))
        .exec(&txn)
        .await?;
    Booking::delete_by_id(booking.id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Booking #{} deleted by {}", id, caller.username);
    Ok(())
}

/// Slots on `date` that still have at least one table able to seat
/// `guests`, with the number of such tables left.
pub async fn available_slots(
    db: &DatabaseConnection,
    date: NaiveDate,
    guests: i32,
    now: NaiveDateTime,
) -> Result<Vec<SlotAvailability>, DomainError> {
    let suitable: Vec<i32> = Table::find()
        .filter(restaurant_table::Column::Capacity.gte(guests))
        .filter(restaurant_table::Column::IsAvailable.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let mut held: HashMap<TimeSlot, u64> = HashMap::new();
    if !suitable.is_empty() {
        let bookings = Booking::find()
            .filter(booking::Column::Date.eq(date))
            .filter(booking::Column::TableId.is_in(suitable.clone()))
            .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE))
            .all(db)
            .await?;

        let taken: HashSet<(TimeSlot, i32)> = bookings
            .into_iter()
            .filter(|b| b.effective_status(now).is_active())
            .map(|b| (b.time_slot, b.table_id))
            .collect();

        for (slot, _) in taken {
            *held.entry(slot).or_insert(0) += 1;
        }
    }

    Ok(schedule::available_slots(suitable.len() as u64, &held))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db;

    async fn fixture() -> (DatabaseConnection, user::Model, restaurant_table::Model) {
        let db = db::init_db("sqlite::memory:").await.unwrap();
        let now = now_timestamp();
        let user = user::ActiveModel {
            username: Set("guest".to_string()),
            email: Set("guest@example.com".to_string()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            password_hash: Set("hash".to_string()),
            is_staff: Set(false),
            token_version: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let table = restaurant_table::ActiveModel {
            number: Set(5),
            capacity: Set(4),
            location: Set("Center".to_string()),
            is_available: Set(true),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        (db, user, table)
    }

    fn row(user_id: i32, table_id: i32, status: BookingStatus) -> booking::ActiveModel {
        let now = now_timestamp();
        booking::ActiveModel {
            user_id: Set(user_id),
            table_id: Set(table_id),
            date: Set(NaiveDate::from_ymd_opt(2099, 6, 1).unwrap()),
            time_slot: Set(TimeSlot::H1900),
            number_of_guests: Set(2),
            customer_name: Set("Ana".to_string()),
            customer_email: Set("ana@example.com".to_string()),
            customer_phone: Set("555-0100".to_string()),
            special_requests: Set(String::new()),
            status: Set(status),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lost_race_surfaces_as_conflict() {
        let (db, user, table) = fixture().await;

        // Both writers passed the pre-check; only the first insert survives
        insert_booking(&db, row(user.id, table.id, BookingStatus::Pending))
            .await
            .unwrap();
        let err = insert_booking(&db, row(user.id, table.id, BookingStatus::Pending))
            .await
            .unwrap_err();

        match err {
            DomainError::Conflict(msg) => assert_eq!(msg, CONFLICT_MESSAGE),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inactive_rows_do_not_hold_the_slot() {
        let (db, user, table) = fixture().await;

        insert_booking(&db, row(user.id, table.id, BookingStatus::Cancelled))
            .await
            .unwrap();
        insert_booking(&db, row(user.id, table.id, BookingStatus::Completed))
            .await
            .unwrap();
        insert_booking(&db, row(user.id, table.id, BookingStatus::Confirmed))
            .await
            .unwrap();
    }
}
