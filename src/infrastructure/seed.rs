use sea_orm::*;

use crate::domain::DomainError;
use crate::infrastructure::auth::hash_password;
use crate::models::{category, menu_item, restaurant_table, user};
use crate::services::now_timestamp;

const CATEGORIES: &[(&str, &str)] = &[
    ("Appetizers", "Start your meal with our delicious appetizers"),
    ("Main Courses", "Hearty main dishes for every taste"),
    ("Desserts", "Sweet endings to your perfect meal"),
    ("Beverages", "Refreshing drinks and beverages"),
];

// (name, price in cents, category, description)
const MENU: &[(&str, i64, &str, &str)] = &[
    ("Bruschetta", 899, "Appetizers", "Toasted bread topped with tomatoes and basil"),
    ("Calamari", 1299, "Appetizers", "Crispy fried squid with marinara sauce"),
    ("Grilled Salmon", 2499, "Main Courses", "Fresh salmon with lemon butter sauce"),
    ("Chicken Parmesan", 1899, "Main Courses", "Breaded chicken with tomato sauce and cheese"),
    ("Tiramisu", 799, "Desserts", "Classic Italian coffee-flavored dessert"),
    ("Chocolate Lava Cake", 899, "Desserts", "Warm chocolate cake with molten center"),
    ("Italian Soda", 499, "Beverages", "Refreshing sparkling drink with fruit syrup"),
    ("House Wine", 999, "Beverages", "Glass of our finest house wine"),
];

// (number, capacity, location)
const TABLES: &[(i32, i32, &str)] = &[
    (1, 2, "Window"),
    (2, 2, "Window"),
    (3, 4, "Center"),
    (4, 4, "Center"),
    (5, 4, "Center"),
    (6, 6, "Private"),
    (7, 6, "Private"),
    (8, 8, "Private"),
    (9, 4, "Patio"),
    (10, 4, "Patio"),
];

/// Sample menu, floor plan and an `admin` staff account. Rows that already
/// exist (matched by name, number or username) are left alone, so running
/// this twice is harmless.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    let now = now_timestamp();

    // 1. Categories
    for (name, description) in CATEGORIES {
        let inserted = category::Entity::insert(category::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            created_at: Set(now.clone()),
            ..Default::default()
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(category::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
        if inserted > 0 {
            tracing::info!("Created category: {}", name);
        }
    }

    // 2. Menu items
    for (name, price_cents, category_name, description) in MENU {
        let exists = menu_item::Entity::find()
            .filter(menu_item::Column::Name.eq(*name))
            .count(db)
            .await?
            > 0;
        if exists {
            continue;
        }

        let category = category::Entity::find()
            .filter(category::Column::Name.eq(*category_name))
            .one(db)
            .await?
            .ok_or(DomainError::NotFound("Category"))?;

        menu_item::ActiveModel {
            name: Set(name.to_string()),
            price_cents: Set(*price_cents),
            category_id: Set(category.id),
            description: Set(description.to_string()),
            image: Set(None),
            is_available: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        tracing::info!("Created menu item: {}", name);
    }

    // 3. Tables
    for (number, capacity, location) in TABLES {
        let inserted = restaurant_table::Entity::insert(restaurant_table::ActiveModel {
            number: Set(*number),
            capacity: Set(*capacity),
            location: Set(location.to_string()),
            is_available: Set(true),
            created_at: Set(now.clone()),
            ..Default::default()
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(restaurant_table::Column::Number)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
        if inserted > 0 {
            tracing::info!("Created table: {} ({} persons)", number, capacity);
        }
    }

    // 4. Staff account
    let admin_exists = user::Entity::find()
        .filter(user::Column::Username.eq("admin"))
        .count(db)
        .await?
        > 0;
    if !admin_exists {
        let password_hash = hash_password("admin123").map_err(DomainError::Internal)?;
        user::ActiveModel {
            username: Set("admin".to_owned()),
            email: Set("admin@littlelemon.com".to_owned()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            password_hash: Set(password_hash),
            is_staff: Set(true),
            token_version: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        tracing::info!("Created admin user: admin");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = db::init_db("sqlite::memory:").await.unwrap();

        seed_demo_data(&db).await.unwrap();
        seed_demo_data(&db).await.unwrap();

        assert_eq!(category::Entity::find().count(&db).await.unwrap(), 4);
        assert_eq!(menu_item::Entity::find().count(&db).await.unwrap(), 8);
        assert_eq!(restaurant_table::Entity::find().count(&db).await.unwrap(), 10);
        let admin = user::Entity::find()
            .filter(user::Column::Username.eq("admin"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_staff);
    }
}
