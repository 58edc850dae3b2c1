//! Access policy
//!
//! Every (resource, action, role) combination the API accepts is listed in
//! `RULES`; anything missing is denied. `Scope::Own` grants the action only
//! on rows the caller owns.

use super::DomainError;
use crate::models::user;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    MenuItem,
    Table,
    Booking,
    Order,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    Cancel,
    Confirm,
    UpdateStatus,
    ViewStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Anonymous,
    Customer,
    Staff,
}

impl Role {
    pub fn of(user: Option<&user::Model>) -> Role {
        match user {
            None => Role::Anonymous,
            Some(u) if u.is_staff => Role::Staff,
            Some(_) => Role::Customer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Own,
}

use Action::*;
use Resource::*;
use Role::*;
use Scope::*;

const RULES: &[(Resource, Action, Role, Scope)] = &[
    // Categories: staff write, authenticated read
    (Category, List, Customer, All),
    (Category, List, Staff, All),
    (Category, Retrieve, Customer, All),
    (Category, Retrieve, Staff, All),
    (Category, Create, Staff, All),
    (Category, Update, Staff, All),
    (Category, Delete, Staff, All),
    // Menu items: staff write, public read
    (MenuItem, List, Anonymous, All),
    (MenuItem, List, Customer, All),
    (MenuItem, List, Staff, All),
    (MenuItem, Retrieve, Anonymous, All),
    (MenuItem, Retrieve, Customer, All),
    (MenuItem, Retrieve, Staff, All),
    (MenuItem, Create, Staff, All),
    (MenuItem, Update, Staff, All),
    (MenuItem, Delete, Staff, All),
    // Tables: staff write, authenticated read
    (Table, List, Customer, All),
    (Table, List, Staff, All),
    (Table, Retrieve, Customer, All),
    (Table, Retrieve, Staff, All),
    (Table, Create, Staff, All),
    (Table, Update, Staff, All),
    (Table, Delete, Staff, All),
    // Bookings: customers manage their own, staff manage all
    (Booking, List, Customer, Own),
    (Booking, List, Staff, All),
    (Booking, Retrieve, Customer, Own),
    (Booking, Retrieve, Staff, All),
    (Booking, Create, Customer, Own),
    (Booking, Create, Staff, Own),
    (Booking, Update, Customer, Own),
    (Booking, Update, Staff, All),
    (Booking, Delete, Customer, Own),
    (Booking, Delete, Staff, All),
    (Booking, Cancel, Customer, Own),
    (Booking, Cancel, Staff, All),
    // Confirmation is a front-of-house action; owners may only cancel
    (Booking, Confirm, Staff, All),
    // Orders: customers manage their own, status is staff-only
    (Order, List, Customer, Own),
    (Order, List, Staff, All),
    (Order, Retrieve, Customer, Own),
    (Order, Retrieve, Staff, All),
    (Order, Create, Customer, Own),
    (Order, Create, Staff, Own),
    (Order, Update, Customer, Own),
    (Order, Update, Staff, All),
    (Order, Delete, Customer, Own),
    (Order, Delete, Staff, All),
    (Order, UpdateStatus, Staff, All),
    // Reporting
    (Dashboard, ViewStats, Staff, All),
];

pub fn lookup(resource: Resource, action: Action, role: Role) -> Option<Scope> {
    RULES
        .iter()
        .find(|(r, a, ro, _)| *r == resource && *a == action && *ro == role)
        .map(|(_, _, _, scope)| *scope)
}

fn denial_message(resource: Resource, action: Action) -> &'static str {
    match (resource, action) {
        (Booking, Cancel) => "You do not have permission to cancel this booking.",
        (Order, UpdateStatus) => "Only staff members can update order status.",
        _ => "You do not have permission to perform this action.",
    }
}

/// Gate an action for `role`. Anonymous callers are told to authenticate;
/// authenticated callers get a permission error.
pub fn authorize(resource: Resource, action: Action, role: Role) -> Result<Scope, DomainError> {
    match lookup(resource, action, role) {
        Some(scope) => Ok(scope),
        None if role == Anonymous => Err(DomainError::Unauthorized(
            "Authentication credentials were not provided.".to_string(),
        )),
        None => Err(DomainError::Forbidden(
            denial_message(resource, action).to_string(),
        )),
    }
}

/// Row-level check applied after the generic gate, for actions that must be
/// performed by the row owner or a staff member.
pub fn ensure_owner_or_staff(
    resource: Resource,
    action: Action,
    caller: &user::Model,
    owner_id: i32,
) -> Result<(), DomainError> {
    if caller.is_staff || caller.id == owner_id {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            denial_message(resource, action).to_string(),
        ))
    }
}

/// Whether a row owned by `owner_id` is visible under `scope`.
pub fn can_see(scope: Scope, caller_id: i32, owner_id: i32) -> bool {
    scope == All || caller_id == owner_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_writes_are_staff_only() {
        for resource in [Category, MenuItem, Table] {
            for action in [Create, Update, Delete] {
                assert_eq!(lookup(resource, action, Staff), Some(All));
                assert!(matches!(
                    authorize(resource, action, Customer),
                    Err(DomainError::Forbidden(_))
                ));
            }
        }
    }

    #[test]
    fn test_menu_is_public_but_tables_are_not() {
        assert_eq!(lookup(MenuItem, List, Anonymous), Some(All));
        assert!(matches!(
            authorize(Table, List, Anonymous),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize(Category, Retrieve, Anonymous),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_customers_are_scoped_to_their_rows() {
        assert_eq!(lookup(Booking, List, Customer), Some(Own));
        assert_eq!(lookup(Order, Retrieve, Customer), Some(Own));
        assert_eq!(lookup(Booking, List, Staff), Some(All));
        assert!(can_see(Own, 3, 3));
        assert!(!can_see(Own, 3, 4));
        assert!(can_see(All, 3, 4));
    }

    #[test]
    fn test_status_update_and_stats_need_staff() {
        let err = authorize(Order, UpdateStatus, Customer).unwrap_err();
        assert_eq!(err.to_string(), "Only staff members can update order status.");
        assert!(authorize(Dashboard, ViewStats, Customer).is_err());
        assert!(authorize(Booking, Confirm, Customer).is_err());
    }

    #[test]
    fn test_owner_or_staff() {
        let mut caller = user::Model {
            id: 7,
            username: "guest".into(),
            email: "guest@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            is_staff: false,
            token_version: 0,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(ensure_owner_or_staff(Booking, Cancel, &caller, 7).is_ok());
        assert!(ensure_owner_or_staff(Booking, Cancel, &caller, 8).is_err());
        caller.is_staff = true;
        assert!(ensure_owner_or_staff(Booking, Cancel, &caller, 8).is_ok());
    }
}
