use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::pricing;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub menu_item_id: i32,
    pub quantity: i32,
    /// Menu price captured at the line's most recent save.
    pub unit_price_cents: i64,
    pub price_cents: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::menu_item::Entity",
        from = "Column::MenuItemId",
        to = "super::menu_item::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    MenuItem,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub id: i32,
    pub menu_item: i32,
    pub menu_item_name: String,
    pub menu_item_price: Decimal,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

impl OrderItemView {
    pub fn new(item: Model, menu_item: Option<&super::menu_item::Model>) -> Self {
        Self {
            id: item.id,
            menu_item: item.menu_item_id,
            menu_item_name: menu_item.map(|m| m.name.clone()).unwrap_or_default(),
            menu_item_price: menu_item
                .map(|m| m.price())
                .unwrap_or_else(|| pricing::from_cents(0)),
            quantity: item.quantity,
            unit_price: pricing::from_cents(item.unit_price_cents),
            price: pricing::from_cents(item.price_cents),
        }
    }
}
