//! Domain layer - Business rules
//!
//! Errors, access policy, booking schedule rules and money arithmetic.
//! Nothing here touches the database or HTTP.

pub mod errors;
pub mod policy;
pub mod pricing;
pub mod schedule;

pub use errors::DomainError;
