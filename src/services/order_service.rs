//! Order Service - orders, line items and derived totals
//!
//! A line's unit price is re-read from the live menu item every time the line
//! is saved, and the parent order's total is recomputed from its current
//! lines right after. `recompute_order_total` is the only writer of
//! `orders.total_cents`.

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::{Deserialize, Deserializer};
use std::collections::{HashMap, HashSet};

use super::{Ordering, booking_service, now_timestamp};
use crate::domain::errors::is_unique_violation;
use crate::domain::policy::{self, Action, Resource, Role, Scope};
use crate::domain::{DomainError, pricing};
use crate::models::OrderStatus;
use crate::models::booking::{self, Entity as Booking};
use crate::models::menu_item::{self, Entity as MenuItem};
use crate::models::order::{self, Entity as Order, OrderView};
use crate::models::order_item::{self, Entity as OrderItem, OrderItemView};
use crate::models::user::{self, Entity as User};

#[derive(Debug, Clone, Deserialize)]
pub struct LineInput {
    pub menu_item: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderInput {
    #[serde(default)]
    pub booking: Option<i32>,
    #[serde(default)]
    pub special_instructions: String,
    #[serde(default)]
    pub items: Vec<LineInput>,
}

/// Editable order fields. `booking: null` detaches the booking; an absent
/// key leaves it untouched.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OrderPatch {
    #[serde(default, deserialize_with = "present")]
    pub booking: Option<Option<i32>>,
    pub special_instructions: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityInput {
    pub quantity: i32,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub booking: Option<i32>,
    pub ordering: Option<String>,
}

fn check_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::field(
            "quantity",
            "Ensure this value is greater than or equal to 1.",
        ));
    }
    Ok(())
}

/// Sum the order's current lines and persist the result as its total.
pub async fn recompute_order_total<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> Result<i64, DomainError> {
    let lines = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(db)
        .await?;
    let total = pricing::order_total_cents(lines.iter());

    Order::update_many()
        .col_expr(order::Column::TotalCents, Expr::value(total))
        .col_expr(order::Column::UpdatedAt, Expr::value(now_timestamp()))
        .filter(order::Column::Id.eq(order_id))
        .exec(db)
        .await?;

    tracing::debug!("Order #{} total recomputed: {} cents", order_id, total);
    Ok(total)
}

/// Create or update one line, pricing it from the menu item as it is now,
/// then refresh the order total.
async fn save_line_item<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    line_id: Option<i32>,
    menu_item_id: i32,
    quantity: i32,
) -> Result<order_item::Model, DomainError> {
    check_quantity(quantity)?;

    let menu = MenuItem::find_by_id(menu_item_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            DomainError::field(
                "menu_item",
                format!("Invalid pk \"{}\" - object does not exist.", menu_item_id),
            )
        })?;

    let unit = menu.price_cents;
    let mut active = order_item::ActiveModel {
        order_id: Set(order_id),
        menu_item_id: Set(menu.id),
        quantity: Set(quantity),
        unit_price_cents: Set(unit),
        price_cents: Set(pricing::line_price_cents(unit, quantity)),
        ..Default::default()
    };

    let saved = match line_id {
        Some(id) => {
            active.id = Set(id);
            active.update(db).await?
        }
        None => active.insert(db).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::field("menu_item", "This menu item is already on the order.")
            } else {
                e.into()
            }
        })?,
    };

    recompute_order_total(db, order_id).await?;
    Ok(saved)
}

/// A booking attached to an order must exist and be visible to the caller.
async fn check_booking_reference<C: ConnectionTrait>(
    db: &C,
    caller: &user::Model,
    booking_id: i32,
) -> Result<(), DomainError> {
    let scope = policy::authorize(
        Resource::Booking,
        Action::Retrieve,
        Role::of(Some(caller)),
    )?;
    booking_service::find_visible(db, caller, scope, booking_id)
        .await
        .map(|_| ())
        .map_err(|e| match e {
            DomainError::NotFound(_) => DomainError::field(
                "booking",
                format!("Invalid pk \"{}\" - object does not exist.", booking_id),
            ),
            other => other,
        })
}

async fn find_visible<C: ConnectionTrait>(
    db: &C,
    caller: &user::Model,
    scope: Scope,
    id: i32,
) -> Result<order::Model, DomainError> {
    Order::find_by_id(id)
        .one(db)
        .await?
        .filter(|o| policy::can_see(scope, caller.id, o.user_id))
        .ok_or(DomainError::NotFound("Order"))
}

async fn build_views<C: ConnectionTrait>(
    db: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderView>, DomainError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let user_ids: HashSet<i32> = orders.iter().map(|o| o.user_id).collect();
    let booking_ids: HashSet<i32> = orders.iter().filter_map(|o| o.booking_id).collect();

    let lines = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let menu_ids: HashSet<i32> = lines.iter().map(|l| l.menu_item_id).collect();
    let menu: HashMap<i32, menu_item::Model> = if menu_ids.is_empty() {
        HashMap::new()
    } else {
        MenuItem::find()
            .filter(menu_item::Column::Id.is_in(menu_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect()
    };

    let users: HashMap<i32, String> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let bookings: HashMap<i32, String> = if booking_ids.is_empty() {
        HashMap::new()
    } else {
        Booking::find()
            .filter(booking::Column::Id.is_in(booking_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|b| (b.id, b.summary()))
            .collect()
    };

    let mut lines_by_order: HashMap<i32, Vec<OrderItemView>> = HashMap::new();
    for line in lines {
        let menu_item = menu.get(&line.menu_item_id);
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderItemView::new(line, menu_item));
    }

    Ok(orders
        .into_iter()
        .map(|o| OrderView {
            id: o.id,
            user: o.user_id,
            user_name: users.get(&o.user_id).cloned().unwrap_or_default(),
            booking: o.booking_id,
            booking_info: o.booking_id.and_then(|id| bookings.get(&id).cloned()),
            status: o.status,
            total: o.total(),
            special_instructions: o.special_instructions.clone(),
            items: lines_by_order.remove(&o.id).unwrap_or_default(),
            created_at: o.created_at,
            updated_at: o.updated_at,
        })
        .collect())
}

async fn single_view<C: ConnectionTrait>(db: &C, id: i32) -> Result<OrderView, DomainError> {
    let order = Order::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Order"))?;
    build_views(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("empty order view".to_string()))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub async fn list_orders(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    filter: OrderFilter,
) -> Result<Vec<OrderView>, DomainError> {
    let mut query = Order::find();

    if scope == Scope::Own {
        query = query.filter(order::Column::UserId.eq(caller.id));
    }
    if let Some(status) = filter.status {
        query = query.filter(order::Column::Status.eq(status));
    }
    if let Some(booking_id) = filter.booking {
        query = query.filter(order::Column::BookingId.eq(booking_id));
    }

    query = match Ordering::parse(filter.ordering.as_deref()) {
        Some(o) if o.field == "total" => query.order_by(order::Column::TotalCents, o.direction()),
        Some(o) if o.field == "created_at" => {
            query.order_by(order::Column::CreatedAt, o.direction())
        }
        _ => query.order_by_desc(order::Column::CreatedAt),
    }
    .order_by_desc(order::Column::Id);

    let orders = query.all(db).await?;
    build_views(db, orders).await
}

pub async fn get_order(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
) -> Result<OrderView, DomainError> {
    let order = find_visible(db, caller, scope, id).await?;
    build_views(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("empty order view".to_string()))
}

/// Create an order and its lines in one transaction.
pub async fn create_order(
    db: &DatabaseConnection,
    caller: &user::Model,
    input: OrderInput,
) -> Result<OrderView, DomainError> {
    if input.items.is_empty() {
        return Err(DomainError::field("items", "An order needs at least one item."));
    }
    let mut seen = HashSet::new();
    for line in &input.items {
        check_quantity(line.quantity)?;
        if !seen.insert(line.menu_item) {
            return Err(DomainError::field(
                "items",
                format!("Menu item {} is listed more than once.", line.menu_item),
            ));
        }
    }

    let txn = db.begin().await?;

    if let Some(booking_id) = input.booking {
        check_booking_reference(&txn, caller, booking_id).await?;
    }

    let timestamp = now_timestamp();
    let order = order::ActiveModel {
        user_id: Set(caller.id),
        booking_id: Set(input.booking),
        status: Set(OrderStatus::Pending),
        total_cents: Set(0),
        special_instructions: Set(input.special_instructions),
        created_at: Set(timestamp.clone()),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for line in input.items {
        save_line_item(&txn, order.id, None, line.menu_item, line.quantity).await?;
    }

    let view = single_view(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        "Order #{} created by {} ({} items, total {})",
        view.id,
        caller.username,
        view.items.len(),
        view.total
    );
    Ok(view)
}

/// Edit the order's booking reference and instructions. Status and total are
/// not writable here.
pub async fn update_order(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
    patch: OrderPatch,
) -> Result<OrderView, DomainError> {
    let existing = find_visible(db, caller, scope, id).await?;

    if let Some(Some(booking_id)) = patch.booking {
        check_booking_reference(db, caller, booking_id).await?;
    }

    let mut active: order::ActiveModel = existing.into();
    if let Some(booking) = patch.booking {
        active.booking_id = Set(booking);
    }
    if let Some(instructions) = patch.special_instructions {
        active.special_instructions = Set(instructions);
    }
    active.updated_at = Set(now_timestamp());
    let saved = active.update(db).await?;

    tracing::info!("Order #{} updated by {}", saved.id, caller.username);
    single_view(db, saved.id).await
}

/// Move an order to any status. No transition graph is enforced.
pub async fn update_status(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
    status: Option<&str>,
) -> Result<OrderView, DomainError> {
    let existing = find_visible(db, caller, scope, id).await?;

    let status: OrderStatus = status
        .ok_or_else(|| DomainError::validation("Invalid status."))?
        .parse()
        .map_err(DomainError::Validation)?;

    let previous = existing.status;
    let mut active: order::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(now_timestamp());
    let saved = active.update(db).await?;

    tracing::info!(
        "Order #{} status {} -> {} by {}",
        saved.id,
        previous.as_str(),
        status.as_str(),
        caller.username
    );
    single_view(db, saved.id).await
}

pub async fn delete_order(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    id: i32,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    let order = find_visible(&txn, caller, scope, id).await?;
    OrderItem::delete_many()
        .filter(order_item::Column::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Order::delete_by_id(order.id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Order #{} deleted by {}", id, caller.username);
    Ok(())
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

async fn find_line<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    item_id: i32,
) -> Result<order_item::Model, DomainError> {
    OrderItem::find_by_id(item_id)
        .filter(order_item::Column::OrderId.eq(order_id))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Order item"))
}

pub async fn add_item(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    order_id: i32,
    line: LineInput,
) -> Result<OrderView, DomainError> {
    let txn = db.begin().await?;

    let order = find_visible(&txn, caller, scope, order_id).await?;
    save_line_item(&txn, order.id, None, line.menu_item, line.quantity).await?;
    let view = single_view(&txn, order.id).await?;

    txn.commit().await?;
    tracing::info!("Menu item {} added to order #{}", line.menu_item, order_id);
    Ok(view)
}

/// Change a line's quantity. The line is re-priced from the current menu.
pub async fn update_item(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    order_id: i32,
    item_id: i32,
    quantity: i32,
) -> Result<OrderView, DomainError> {
    let txn = db.begin().await?;

    let order = find_visible(&txn, caller, scope, order_id).await?;
    let line = find_line(&txn, order.id, item_id).await?;
    save_line_item(&txn, order.id, Some(line.id), line.menu_item_id, quantity).await?;
    let view = single_view(&txn, order.id).await?;

    txn.commit().await?;
    Ok(view)
}

pub async fn remove_item(
    db: &DatabaseConnection,
    caller: &user::Model,
    scope: Scope,
    order_id: i32,
    item_id: i32,
) -> Result<OrderView, DomainError> {
    let txn = db.begin().await?;

    let order = find_visible(&txn, caller, scope, order_id).await?;
    let line = find_line(&txn, order.id, item_id).await?;

    let remaining = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .count(&txn)
        .await?;
    if remaining <= 1 {
        return Err(DomainError::validation(
            "An order must keep at least one item.",
        ));
    }

    OrderItem::delete_by_id(line.id).exec(&txn).await?;
    recompute_order_total(&txn, order.id).await?;
    let view = single_view(&txn, order.id).await?;

    txn.commit().await?;
    tracing::info!("Line #{} removed from order #{}", item_id, order_id);
    Ok(view)
}
