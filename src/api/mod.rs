pub mod auth;
pub mod booking;
pub mod category;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod menu_item;
pub mod order;
pub mod table;

use axum::{
    Router,
    routing::{get, post},
};

use crate::domain::DomainError;
use crate::domain::policy::{self, Action, Resource, Role, Scope};
use crate::infrastructure::AppState;
use crate::models::user;

/// Generic per-action permission gate. Row-level rules (ownership on cancel,
/// visibility of other users' rows) are applied by the services.
pub(crate) fn gate(
    user: Option<&user::Model>,
    resource: Resource,
    action: Action,
) -> Result<Scope, DomainError> {
    policy::authorize(resource, action, Role::of(user))
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register/", post(auth::register))
        .route("/auth/login/", post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .route("/auth/profile/", get(auth::profile))
        // Catalog
        .route(
            "/categories/",
            get(category::list_categories).post(category::create_category),
        )
        .route(
            "/categories/:id/",
            get(category::get_category)
                .put(category::replace_category)
                .patch(category::patch_category)
                .delete(category::delete_category),
        )
        .route(
            "/menu-items/",
            get(menu_item::list_menu_items).post(menu_item::create_menu_item),
        )
        .route(
            "/menu-items/:id/",
            get(menu_item::get_menu_item)
                .put(menu_item::replace_menu_item)
                .patch(menu_item::patch_menu_item)
                .delete(menu_item::delete_menu_item),
        )
        // Tables
        .route("/tables/", get(table::list_tables).post(table::create_table))
        .route(
            "/tables/:id/",
            get(table::get_table)
                .put(table::replace_table)
                .patch(table::patch_table)
                .delete(table::delete_table),
        )
        // Bookings
        .route(
            "/bookings/",
            get(booking::list_bookings).post(booking::create_booking),
        )
        .route("/bookings/available-slots/", get(booking::available_slots))
        .route(
            "/bookings/:id/",
            get(booking::get_booking)
                .put(booking::replace_booking)
                .patch(booking::patch_booking)
                .delete(booking::delete_booking),
        )
        .route("/bookings/:id/cancel/", post(booking::cancel_booking))
        .route("/bookings/:id/confirm/", post(booking::confirm_booking))
        // Orders
        .route("/orders/", get(order::list_orders).post(order::create_order))
        .route(
            "/orders/:id/",
            get(order::get_order)
                .put(order::update_order)
                .patch(order::update_order)
                .delete(order::delete_order),
        )
        .route("/orders/:id/update_status/", post(order::update_status))
        .route("/orders/:id/items/", post(order::add_item))
        .route(
            "/orders/:id/items/:item_id/",
            axum::routing::patch(order::update_item).delete(order::remove_item),
        )
        // Reporting
        .route("/dashboard/stats/", get(dashboard::stats))
        .with_state(state)
}
