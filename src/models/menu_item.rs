use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::pricing;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub price_cents: i64,
    pub category_id: i32,
    pub description: String,
    pub image: Option<String>,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn price(&self) -> Decimal {
        pricing::from_cents(self.price_cents)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItemView {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub category: i32,
    pub category_name: String,
    pub description: String,
    pub image: Option<String>,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl MenuItemView {
    pub fn new(item: Model, category_name: String) -> Self {
        Self {
            id: item.id,
            price: item.price(),
            name: item.name,
            category: item.category_id,
            category_name,
            description: item.description,
            image: item.image,
            is_available: item.is_available,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}
