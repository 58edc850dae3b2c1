//! Services Layer
//!
//! This module contains pure business logic extracted from HTTP handlers.
//! Every function takes a database handle and returns `DomainError` on
//! failure; the HTTP layer only translates requests and responses.

pub mod auth_service;
pub mod booking_service;
pub mod catalog_service;
pub mod order_service;
pub mod report_service;
pub mod table_service;

use chrono::{Local, NaiveDateTime};

/// Timestamp format used for every `created_at`/`updated_at` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Current local wall-clock time, the reference point for booking slots.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parsed `ordering` query parameter: a field name, optionally prefixed
/// with `-` for descending order. Only the first comma-separated term is
/// honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let term = raw?.split(',').next()?.trim();
        if term.is_empty() {
            return None;
        }
        match term.strip_prefix('-') {
            Some(field) => Some(Self {
                field: field.to_string(),
                descending: true,
            }),
            None => Some(Self {
                field: term.to_string(),
                descending: false,
            }),
        }
    }

    pub fn direction(&self) -> sea_orm::Order {
        if self.descending {
            sea_orm::Order::Desc
        } else {
            sea_orm::Order::Asc
        }
    }
}

/// Trimmed, non-empty search term.
pub(crate) fn search_term(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Loose email shape check: one `@`, a dotted domain, no whitespace.
pub(crate) fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_parse() {
        assert_eq!(
            Ordering::parse(Some("-price")),
            Some(Ordering {
                field: "price".into(),
                descending: true
            })
        );
        assert_eq!(
            Ordering::parse(Some("name,price")),
            Some(Ordering {
                field: "name".into(),
                descending: false
            })
        );
        assert_eq!(Ordering::parse(Some("")), None);
        assert_eq!(Ordering::parse(None), None);
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ana@example.com"));
        assert!(!looks_like_email("ana.example.com"));
        assert!(!looks_like_email("ana@localhost"));
        assert!(!looks_like_email("a na@example.com"));
    }
}
