//! Catalog Service - categories and menu items

use rust_decimal::Decimal;
use sea_orm::*;
use serde::Deserialize;
use std::collections::BTreeSet;

use super::{Ordering, now_timestamp, order_service, search_term};
use crate::domain::errors::is_unique_violation;
use crate::domain::{DomainError, pricing};
use crate::models::category::{self, CategoryView, Entity as Category};
use crate::models::menu_item::{self, Entity as MenuItem, MenuItemView};
use crate::models::order_item::{self, Entity as OrderItem};

const NAME_MAX_LEN: usize = 100;

fn check_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::field("name", "This field may not be blank."));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::field(
            "name",
            format!("Ensure this field has no more than {} characters.", NAME_MAX_LEN),
        ));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<CategoryInput> for CategoryPatch {
    fn from(input: CategoryInput) -> Self {
        Self {
            name: Some(input.name),
            description: Some(input.description),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CategoryFilter {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

async fn category_view<C: ConnectionTrait>(
    db: &C,
    category: category::Model,
) -> Result<CategoryView, DomainError> {
    let menu_items_count = MenuItem::find()
        .filter(menu_item::Column::CategoryId.eq(category.id))
        .count(db)
        .await?;

    Ok(CategoryView {
        id: category.id,
        name: category.name,
        description: category.description,
        menu_items_count,
        created_at: category.created_at,
    })
}

fn category_write_error(e: DbErr) -> DomainError {
    if is_unique_violation(&e) {
        DomainError::field("name", "category with this name already exists.")
    } else {
        e.into()
    }
}

pub async fn list_categories(
    db: &DatabaseConnection,
    filter: CategoryFilter,
) -> Result<Vec<CategoryView>, DomainError> {
    let mut query = Category::find();

    if let Some(q) = search_term(&filter.search) {
        query = query.filter(
            Condition::any()
                .add(category::Column::Name.contains(q))
                .add(category::Column::Description.contains(q)),
        );
    }

    query = match Ordering::parse(filter.ordering.as_deref()) {
        Some(o) if o.field == "name" => query.order_by(category::Column::Name, o.direction()),
        Some(o) if o.field == "created_at" => {
            query.order_by(category::Column::CreatedAt, o.direction())
        }
        _ => query.order_by_asc(category::Column::Name),
    };

    let categories = query.all(db).await?;

    let mut views = Vec::with_capacity(categories.len());
    for category in categories {
        views.push(category_view(db, category).await?);
    }
    Ok(views)
}

pub async fn get_category(db: &DatabaseConnection, id: i32) -> Result<CategoryView, DomainError> {
    let category = Category::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Category"))?;
    category_view(db, category).await
}

pub async fn create_category(
    db: &DatabaseConnection,
    input: CategoryInput,
) -> Result<CategoryView, DomainError> {
    let name = check_name(&input.name)?;

    let saved = category::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        created_at: Set(now_timestamp()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(category_write_error)?;

    tracing::info!("Created category #{} '{}'", saved.id, saved.name);
    category_view(db, saved).await
}

pub async fn update_category(
    db: &DatabaseConnection,
    id: i32,
    patch: CategoryPatch,
) -> Result<CategoryView, DomainError> {
    let existing = Category::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Category"))?;

    let mut active: category::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(check_name(&name)?);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }

    let saved = active.update(db).await.map_err(category_write_error)?;
    category_view(db, saved).await
}

/// Delete a category together with its menu items.
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    Category::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound("Category"))?;

    let item_ids: Vec<i32> = MenuItem::find()
        .filter(menu_item::Column::CategoryId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();

    remove_menu_items(&txn, &item_ids).await?;
    Category::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Deleted category #{} and {} menu items", id, item_ids.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Menu items
// ---------------------------------------------------------------------------

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    pub price: Decimal,
    pub category: i32,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<i32>,
    pub description: Option<String>,
    /// An empty string clears the image
    pub image: Option<String>,
    pub is_available: Option<bool>,
}

impl From<MenuItemInput> for MenuItemPatch {
    fn from(input: MenuItemInput) -> Self {
        Self {
            name: Some(input.name),
            price: Some(input.price),
            category: Some(input.category),
            description: Some(input.description),
            image: Some(input.image.unwrap_or_default()),
            is_available: Some(input.is_available),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MenuItemFilter {
    pub category: Option<i32>,
    pub is_available: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

async fn ensure_category<C: ConnectionTrait>(db: &C, id: i32) -> Result<category::Model, DomainError> {
    Category::find_by_id(id).one(db).await?.ok_or_else(|| {
        DomainError::field(
            "category",
            format!("Invalid pk \"{}\" - object does not exist.", id),
        )
    })
}

pub async fn list_menu_items(
    db: &DatabaseConnection,
    filter: MenuItemFilter,
) -> Result<Vec<MenuItemView>, DomainError> {
    let mut query = MenuItem::find().find_also_related(Category);

    if let Some(category_id) = filter.category {
        query = query.filter(menu_item::Column::CategoryId.eq(category_id));
    }
    if let Some(available) = filter.is_available {
        query = query.filter(menu_item::Column::IsAvailable.eq(available));
    }
    if let Some(q) = search_term(&filter.search) {
        query = query.filter(
            Condition::any()
                .add(menu_item::Column::Name.contains(q))
                .add(menu_item::Column::Description.contains(q)),
        );
    }

    query = match Ordering::parse(filter.ordering.as_deref()) {
        Some(o) if o.field == "name" => query.order_by(menu_item::Column::Name, o.direction()),
        Some(o) if o.field == "price" => {
            query.order_by(menu_item::Column::PriceCents, o.direction())
        }
        Some(o) if o.field == "category" || o.field == "category__name" => {
            query.order_by(category::Column::Name, o.direction())
        }
        _ => query
            .order_by_asc(category::Column::Name)
            .order_by_asc(menu_item::Column::Name),
    };

    let rows = query.all(db).await?;

    Ok(rows
        .into_iter()
        .map(|(item, category)| {
            let category_name = category.map(|c| c.name).unwrap_or_default();
            MenuItemView::new(item, category_name)
        })
        .collect())
}

pub async fn get_menu_item(db: &DatabaseConnection, id: i32) -> Result<MenuItemView, DomainError> {
    let (item, category) = MenuItem::find_by_id(id)
        .find_also_related(Category)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Menu item"))?;

    Ok(MenuItemView::new(
        item,
        category.map(|c| c.name).unwrap_or_default(),
    ))
}

pub async fn create_menu_item(
    db: &DatabaseConnection,
    input: MenuItemInput,
) -> Result<MenuItemView, DomainError> {
    let name = check_name(&input.name)?;
    let price_cents = pricing::menu_price_cents(input.price)?;
    let category = ensure_category(db, input.category).await?;
    let now = now_timestamp();

    let saved = menu_item::ActiveModel {
        name: Set(name),
        price_cents: Set(price_cents),
        category_id: Set(category.id),
        description: Set(input.description),
        image: Set(input.image.filter(|s| !s.is_empty())),
        is_available: Set(input.is_available),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(
        "Created menu item #{} '{}' at {}",
        saved.id,
        saved.name,
        saved.price()
    );
    Ok(MenuItemView::new(saved, category.name))
}

/// Update a menu item. Existing order lines keep their unit price until the
/// line itself is saved again.
pub async fn update_menu_item(
    db: &DatabaseConnection,
    id: i32,
    patch: MenuItemPatch,
) -> Result<MenuItemView, DomainError> {
    let existing = MenuItem::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("Menu item"))?;

    let category = ensure_category(db, patch.category.unwrap_or(existing.category_id)).await?;

    let mut active: menu_item::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(check_name(&name)?);
    }
    if let Some(price) = patch.price {
        active.price_cents = Set(pricing::menu_price_cents(price)?);
    }
    if patch.category.is_some() {
        active.category_id = Set(category.id);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(image) = patch.image {
        active.image = Set(Some(image).filter(|s| !s.is_empty()));
    }
    if let Some(available) = patch.is_available {
        active.is_available = Set(available);
    }
    active.updated_at = Set(now_timestamp());

    let saved = active.update(db).await?;
    Ok(MenuItemView::new(saved, category.name))
}

pub async fn delete_menu_item(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    MenuItem::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound("Menu item"))?;

    remove_menu_items(&txn, &[id]).await?;

    txn.commit().await?;
    tracing::info!("Deleted menu item #{}", id);
    Ok(())
}

/// Remove menu items along with the order lines that reference them, then
/// bring the affected orders' totals back in line with their remaining lines.
async fn remove_menu_items<C: ConnectionTrait>(db: &C, item_ids: &[i32]) -> Result<(), DomainError> {
    if item_ids.is_empty() {
        return Ok(());
    }

    let affected_orders: BTreeSet<i32> = OrderItem::find()
        .filter(order_item::Column::MenuItemId.is_in(item_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|line| line.order_id)
        .collect();

    OrderItem::delete_many()
        .filter(order_item::Column::MenuItemId.is_in(item_ids.to_vec()))
        .exec(db)
        .await?;

    MenuItem::delete_many()
        .filter(menu_item::Column::Id.is_in(item_ids.to_vec()))
        .exec(db)
        .await?;

    for order_id in affected_orders {
        order_service::recompute_order_total(db, order_id).await?;
    }
    Ok(())
}
