//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Authentication (auth)
//! - Sample data (seed)
//! - Application state (state)

pub mod auth;
pub mod config;
pub mod db;
pub mod seed;
pub mod server;
pub mod state;

pub use state::AppState;
