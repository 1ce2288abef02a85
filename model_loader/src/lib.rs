//! model_loader: registers model definitions with a database model factory
//!
//! Definitions come from a [`DefinitionCatalog`] of typed factories and,
//! optionally, from declared definition files in a models directory. The
//! [`Loader`] waits for the client to be ready, creates every model, and only
//! then runs each definition's `initialize` hook, so hooks can wire
//! relationships to any model of the same load.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::{Config, LogSink, RawConfig};
pub use db::{DatabaseConnection, ModelClient, SqlModel, SqlModelClient};
pub use error::{Error, Result};
pub use model_loader_macros::ModelSchema;
pub use models::{
    discover_definitions, initialize, DeclaredDefinition, Definition, DefinitionCatalog, Loader,
    SchemaDefinition,
};
pub use schema::{FieldDefinition, ModelOptions, ModelSchema, Relation, RelationKind, Schema};
