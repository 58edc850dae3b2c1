//! Report Service - dashboard snapshot

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;

use crate::domain::{DomainError, pricing};
use crate::models::booking::{self, Entity as Booking};
use crate::models::menu_item;
use crate::models::order::{self, Entity as Order};
use crate::models::order_item::{self, Entity as OrderItem};
use crate::models::{BookingStatus, OrderStatus};

const POPULAR_ITEMS_LIMIT: u64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CountSnapshot {
    pub total: u64,
    pub today: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueSnapshot {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub today: Decimal,
}

#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct PopularItem {
    pub menu_item_name: String,
    pub total_ordered: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub bookings: CountSnapshot,
    pub orders: CountSnapshot,
    pub revenue: RevenueSnapshot,
    pub popular_items: Vec<PopularItem>,
}

async fn revenue_cents(db: &DatabaseConnection, day_prefix: Option<&str>) -> Result<i64, DbErr> {
    let mut query = Order::find()
        .select_only()
        .column_as(order::Column::TotalCents.sum(), "revenue");
    if let Some(prefix) = day_prefix {
        query = query.filter(order::Column::CreatedAt.starts_with(prefix));
    }

    let sum: Option<Option<i64>> = query.into_tuple().one(db).await?;
    Ok(sum.flatten().unwrap_or(0))
}

async fn booking_counts(
    db: &DatabaseConnection,
    now: NaiveDateTime,
) -> Result<CountSnapshot, DbErr> {
    let total = Booking::find().count(db).await?;
    let today = Booking::find()
        .filter(booking::Column::Date.eq(now.date()))
        .count(db)
        .await?;

    // A stored pending booking whose slot has started already counts as completed
    let pending = Booking::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .all(db)
        .await?
        .iter()
        .filter(|b| b.effective_status(now) == BookingStatus::Pending)
        .count() as u64;

    Ok(CountSnapshot {
        total,
        today,
        pending,
    })
}

async fn order_counts(db: &DatabaseConnection, day_prefix: &str) -> Result<CountSnapshot, DbErr> {
    Ok(CountSnapshot {
        total: Order::find().count(db).await?,
        today: Order::find()
            .filter(order::Column::CreatedAt.starts_with(day_prefix))
            .count(db)
            .await?,
        pending: Order::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?,
    })
}

/// Top menu items by quantity ordered across every order, regardless of
/// order status.
async fn popular_items(db: &DatabaseConnection) -> Result<Vec<PopularItem>, DbErr> {
    OrderItem::find()
        .select_only()
        .column_as(menu_item::Column::Name, "menu_item_name")
        .column_as(order_item::Column::Quantity.sum(), "total_ordered")
        .join(JoinType::InnerJoin, order_item::Relation::MenuItem.def())
        .group_by(menu_item::Column::Name)
        .order_by_desc(Expr::cust("total_ordered"))
        .order_by_asc(menu_item::Column::Name)
        .limit(POPULAR_ITEMS_LIMIT)
        .into_model::<PopularItem>()
        .all(db)
        .await
}

pub async fn dashboard_stats(
    db: &DatabaseConnection,
    now: NaiveDateTime,
) -> Result<DashboardStats, DomainError> {
    let day_prefix = now.date().format("%Y-%m-%d").to_string();

    let stats = DashboardStats {
        bookings: booking_counts(db, now).await?,
        orders: order_counts(db, &day_prefix).await?,
        revenue: RevenueSnapshot {
            total: pricing::from_cents(revenue_cents(db, None).await?),
            today: pricing::from_cents(revenue_cents(db, Some(&day_prefix)).await?),
        },
        popular_items: popular_items(db).await?,
    };

    tracing::debug!(
        "Dashboard snapshot: {} bookings, {} orders",
        stats.bookings.total,
        stats.orders.total
    );
    Ok(stats)
}
