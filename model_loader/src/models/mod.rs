//! Models module for model_loader
//!
//! This module holds the definition contract, the catalog of definition
//! factories, declared definitions and the two-pass loader.

pub mod declared;
pub mod definition;
pub mod loader;

// Re-export key types
pub use declared::{discover_definitions, DeclaredDefinition};
pub use definition::{resolve_identifier, Definition, DefinitionCatalog, DefinitionFactory, SchemaDefinition};
pub use loader::{initialize, Loader};
