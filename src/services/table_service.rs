//! Table Service - seating inventory

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;

use super::{Ordering, now_timestamp};
use crate::domain::DomainError;
use crate::domain::errors::is_unique_violation;
use crate::models::booking::{self, Entity as Booking};
use crate::models::order::{self, Entity as Order};
use crate::models::restaurant_table::{self, Entity as Table, TABLE_SIZES};

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableInput {
    pub number: i32,
    pub capacity: i32,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TablePatch {
    pub number: Option<i32>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub is_available: Option<bool>,
}

impl From<TableInput> for TablePatch {
    fn from(input: TableInput) -> Self {
        Self {
            number: Some(input.number),
            capacity: Some(input.capacity),
            location: Some(input.location),
            is_available: Some(input.is_available),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableFilter {
    pub capacity: Option<i32>,
    pub is_available: Option<bool>,
    pub location: Option<String>,
    pub ordering: Option<String>,
}

fn check_capacity(capacity: i32) -> Result<i32, DomainError> {
    if TABLE_SIZES.contains(&capacity) {
        Ok(capacity)
    } else {
        Err(DomainError::field(
            "capacity",
            format!("\"{}\" is not a valid choice.", capacity),
        ))
    }
}

fn check_location(location: String) -> Result<String, DomainError> {
    if location.chars().count() > 50 {
        return Err(DomainError::field(
            "location",
            "Ensure this field has no more than 50 characters.",
        ));
    }
    Ok(location)
}

fn table_write_error(e: DbErr) -> DomainError {
    if is_unique_violation(&e) {
        DomainError::field("number", "table with this number already exists.")
    } else {
        e.into()
    }
}

pub async fn list_tables(
    db: &DatabaseConnection,
    filter: TableFilter,
) -> Result<Vec<restaurant_table::Model>, DomainError> {
    let mut query = Table::find();

    if let Some(capacity) = filter.capacity {
        query = query.filter(restaurant_table::Column::Capacity.eq(capacity));
    }
    if let Some(available) = filter.is_available {
        query = query.filter(restaurant_table::Column::IsAvailable.eq(available));
    }
    if let Some(location) = filter.location {
        query = query.filter(restaurant_table::Column::Location.eq(location));
    }

    query = match Ordering::parse(filter.ordering.as_deref()) {
        Some(o) if o.field == "capacity" => {
            query.order_by(restaurant_table::Column::Capacity, o.direction())
        }
        Some(o) if o.field == "number" => {
            query.order_by(restaurant_table::Column::Number, o.direction())
        }
        _ => query.order_by_asc(restaurant_table::Column::Number),
    };

    Ok(query.all(db).await?)
}

pub async fn get_table(
    db: &DatabaseConnection,
    id: i32,
) -> Result<restaurant_table::Model, DomainError> {
    Table::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Table"))
}

pub async fn create_table(
    db: &DatabaseConnection,
    input: TableInput,
) -> Result<restaurant_table::Model, DomainError> {
    let saved = restaurant_table::ActiveModel {
        number: Set(input.number),
        capacity: Set(check_capacity(input.capacity)?),
        location: Set(check_location(input.location)?),
        is_available: Set(input.is_available),
        created_at: Set(now_timestamp()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(table_write_error)?;

    tracing::info!(
        "Created table #{} ({} persons)",
        saved.number,
        saved.capacity
    );
    Ok(saved)
}

/// Update a table. Shrinking capacity does not revisit existing bookings.
pub async fn update_table(
    db: &DatabaseConnection,
    id: i32,
    patch: TablePatch,
) -> Result<restaurant_table::Model, DomainError> {
    let existing = get_table(db, id).await?;

    let mut active: restaurant_table::ActiveModel = existing.into();
    if let Some(number) = patch.number {
        active.number = Set(number);
    }
    if let Some(capacity) = patch.capacity {
        active.capacity = Set(check_capacity(capacity)?);
    }
    if let Some(location) = patch.location {
        active.location = Set(check_location(location)?);
    }
    if let Some(available) = patch.is_available {
        active.is_available = Set(available);
    }

    Ok(active.update(db).await.map_err(table_write_error)?)
}

/// Delete a table and its bookings; orders tied to those bookings are kept
/// and simply lose the booking reference.
pub async fn delete_table(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    Table::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound("Table"))?;

    let booking_ids: Vec<i32> = Booking::find()
        .filter(booking::Column::TableId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();

    if !booking_ids.is_empty() {
        Order::update_many()
            .col_expr(order::Column::BookingId, Expr::value(Option::<i32>::None))
            .filter(order::Column::BookingId.is_in(booking_ids.clone()))
            .exec(&txn)
            .await?;
        Booking::delete_many()
            .filter(booking::Column::Id.is_in(booking_ids))
            .exec(&txn)
            .await?;
    }

    Table::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!("Deleted table #{}", id);
    Ok(())
}
