//! Database module for model_loader
//!
//! This module holds the model client contract and its sqlx implementation.

pub mod client;
pub mod connection;
pub mod sql;

// Re-export key types
pub use client::ModelClient;
pub use connection::DatabaseConnection;
pub use sql::{SqlModel, SqlModelClient};
