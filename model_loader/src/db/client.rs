//! Model client contract
//!
//! The loader only needs four things from an ORM: a way to build it from
//! configuration, a readiness signal, model creation, and relation wiring.

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::schema::{ModelOptions, Relation, Schema};

/// A database-model factory the loader registers definitions with
#[async_trait]
pub trait ModelClient: Send + Sync + Sized {
    /// Handle returned for a created model
    type Model: Clone + Send + Sync;

    /// Build a client from the `database` section of the configuration
    async fn connect(config: &Config) -> Result<Self>;

    /// Resolve once the underlying connection is usable
    async fn db_ready(&self) -> Result<()>;

    /// Create the model `id`. Options are `None` when the definition has none
    fn create_model(&self, id: &str, schema: &Schema, options: Option<&ModelOptions>) -> Result<Self::Model>;

    /// Record a relation from `model` to `target`
    fn relate(&self, model: &Self::Model, relation: &Relation, target: &Self::Model) -> Result<()>;
}
