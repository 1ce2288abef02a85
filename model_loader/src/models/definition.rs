//! Model definitions and the catalog of factories that produce them

use indexmap::IndexMap;
use serde_json::Value;
use std::marker::PhantomData;

use crate::db::client::ModelClient;
use crate::error::{Error, Result};
use crate::models::loader::Loader;
use crate::schema::{ModelOptions, ModelSchema, Schema};

/// One model's intent: its identifier, schema, options and initialization hook
pub trait Definition<C: ModelClient>: Send {
    /// Table name; wins over [`Definition::global_id`] when both are set
    fn table_name(&self) -> Option<&str> {
        None
    }

    fn global_id(&self) -> Option<&str> {
        None
    }

    fn schema(&self) -> &Schema;

    fn options(&self) -> Option<&ModelOptions> {
        None
    }

    /// Runs after every model of the load has been created, so `loader`
    /// already holds all of them. `model` is this definition's own handle.
    fn initialize(&mut self, loader: &Loader<C>, model: &C::Model, args: &[Value]) -> Result<()> {
        let _ = (loader, model, args);
        Ok(())
    }
}

/// Builds a definition from the loader and the configured constructor arguments
pub type DefinitionFactory<C> =
    Box<dyn Fn(&Loader<C>, &[Value]) -> Result<Box<dyn Definition<C>>> + Send + Sync>;

/// Resolve the model identifier of a definition.
///
/// `key` names the catalog entry and is only used in the error.
pub fn resolve_identifier<C: ModelClient>(key: &str, definition: &dyn Definition<C>) -> Result<String> {
    definition
        .table_name()
        .filter(|name| !name.is_empty())
        .or_else(|| definition.global_id().filter(|id| !id.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| Error::MissingIdentifier(key.to_string()))
}

/// Definition of a type that implements [`ModelSchema`], usually derived
pub struct SchemaDefinition<T> {
    schema: Schema,
    options: Option<ModelOptions>,
    _model: PhantomData<fn() -> T>,
}

impl<T: ModelSchema> SchemaDefinition<T> {
    pub fn new() -> Self {
        Self {
            schema: T::schema(),
            options: None,
            _model: PhantomData,
        }
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }
}

impl<T: ModelSchema> Default for SchemaDefinition<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ModelClient, T: ModelSchema> Definition<C> for SchemaDefinition<T> {
    fn table_name(&self) -> Option<&str> {
        T::table_name()
    }

    fn global_id(&self) -> Option<&str> {
        Some(T::global_id())
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn options(&self) -> Option<&ModelOptions> {
        self.options.as_ref()
    }
}

/// Ordered registration table of definition factories, keyed like module names
pub struct DefinitionCatalog<C: ModelClient> {
    entries: IndexMap<String, DefinitionFactory<C>>,
}

impl<C: ModelClient> DefinitionCatalog<C> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register a factory under `key`. Re-registering a key replaces the
    /// factory but keeps its original position.
    pub fn register<D, F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        D: Definition<C> + 'static,
        F: Fn(&Loader<C>, &[Value]) -> Result<D> + Send + Sync + 'static,
    {
        let boxed: DefinitionFactory<C> = Box::new(move |loader: &Loader<C>, args: &[Value]| {
            factory(loader, args).map(|definition| Box::new(definition) as Box<dyn Definition<C>>)
        });
        self.entries.insert(key.into(), boxed);
        self
    }

    /// Builder form of [`DefinitionCatalog::register`]
    pub fn with<D, F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        D: Definition<C> + 'static,
        F: Fn(&Loader<C>, &[Value]) -> Result<D> + Send + Sync + 'static,
    {
        self.register(key, factory);
        self
    }

    /// Register a definition that is cloned for every load
    pub fn register_value<D>(&mut self, key: impl Into<String>, definition: D) -> &mut Self
    where
        D: Definition<C> + Clone + Sync + 'static,
    {
        self.register(key, move |_: &Loader<C>, _: &[Value]| Ok(definition.clone()))
    }

    /// Register the [`ModelSchema`] type `T` under `key`
    pub fn register_model<T: ModelSchema + 'static>(&mut self, key: impl Into<String>) -> &mut Self {
        self.register(key, |_: &Loader<C>, _: &[Value]| Ok(SchemaDefinition::<T>::new()))
    }

    /// Builder form of [`DefinitionCatalog::register_model`]
    pub fn with_model<T: ModelSchema + 'static>(mut self, key: impl Into<String>) -> Self {
        self.register_model::<T>(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&DefinitionFactory<C>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DefinitionFactory<C>)> {
        self.entries.iter().map(|(key, factory)| (key.as_str(), factory))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: ModelClient> Default for DefinitionCatalog<C> {
    fn default() -> Self {
        Self::new()
    }
}
