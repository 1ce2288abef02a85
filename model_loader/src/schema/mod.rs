//! Schema module for model_loader
//!
//! This module holds the schema types handed to model clients and the DDL
//! generator used by the SQL client.

pub mod generator;
pub mod types;

pub use generator::{create_table_statements, TableStatements};
pub use types::{
    Column, EnforceMode, FieldDefinition, ForeignKey, ForeignKeyDefinition, Index, ModelOptions,
    PrimaryKey, Relation, RelationKind, Schema, Table,
};

/// A Rust type that describes a model schema, usually via `#[derive(ModelSchema)]`
pub trait ModelSchema {
    /// Explicit table name, if one was given
    fn table_name() -> Option<&'static str>;

    /// Global id of the model, the struct name unless overridden
    fn global_id() -> &'static str;

    /// Field definitions in declaration order
    fn schema() -> Schema;
}
