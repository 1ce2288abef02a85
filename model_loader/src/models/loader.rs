//! Model loader
//!
//! The loader registers every definition with the model client in two
//! passes. Pass one creates all models; pass two runs each definition's
//! `initialize` hook. Pass two never starts before pass one has finished, so
//! a hook may reference any model of the same load.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{Config, RawConfig};
use crate::db::client::ModelClient;
use crate::error::{Error, Result};
use crate::models::declared::discover_definitions;
use crate::models::definition::{resolve_identifier, Definition, DefinitionCatalog, DefinitionFactory};

/// Normalize `raw`, connect a client if none is given, and load `catalog`
pub async fn initialize<C: ModelClient>(
    raw: RawConfig,
    client: Option<C>,
    catalog: &DefinitionCatalog<C>,
) -> Result<Loader<C>> {
    let config = Config::from(raw);

    let client = match client {
        Some(client) => client,
        None => C::connect(&config).await?,
    };

    let mut loader = Loader::new(client);
    loader.load(&config, catalog).await?;
    Ok(loader)
}

/// Registry of the model client and the models created through it
pub struct Loader<C: ModelClient> {
    client: Arc<C>,
    models: IndexMap<String, C::Model>,
}

/// Where a discovered definition comes from
enum Source<'a, C: ModelClient> {
    Factory(&'a DefinitionFactory<C>),
    Declared(Box<dyn Definition<C>>),
}

/// A definition instance with its resolved identifier
struct Loaded<C: ModelClient> {
    id: String,
    definition: Box<dyn Definition<C>>,
}

impl<C: ModelClient> Loader<C> {
    pub fn new(client: C) -> Self {
        Self::with_shared_client(Arc::new(client))
    }

    pub fn with_shared_client(client: Arc<C>) -> Self {
        Self {
            client,
            models: IndexMap::new(),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Models created by the last load, in creation order
    pub fn models(&self) -> &IndexMap<String, C::Model> {
        &self.models
    }

    pub fn model(&self, id: &str) -> Option<&C::Model> {
        self.models.get(id)
    }

    /// Like [`Loader::model`], for hooks that cannot continue without the model
    pub fn require_model(&self, id: &str) -> Result<&C::Model> {
        self.models
            .get(id)
            .ok_or_else(|| Error::InitializationError(format!("Model `{}` is not registered", id)))
    }

    pub fn into_models(self) -> IndexMap<String, C::Model> {
        self.models
    }

    /// Run a full load. The registry is emptied first, so after a failure it
    /// holds exactly what was created before the failing step.
    pub async fn load(&mut self, config: &Config, catalog: &DefinitionCatalog<C>) -> Result<()> {
        self.models.clear();

        self.client.db_ready().await?;
        config.log("DB Ready");

        let sources = Self::discover(config, catalog)?;
        let mut definitions = self.instantiate(config, sources)?;

        for loaded in &definitions {
            config.log(format!("Creating model id: {}", loaded.id));

            let model = self.client.create_model(
                &loaded.id,
                loaded.definition.schema(),
                loaded.definition.options(),
            )?;

            if self.models.insert(loaded.id.clone(), model).is_some() {
                tracing::warn!(model = %loaded.id, "Model id registered twice, keeping the later one");
            }
        }

        let loader: &Self = self;
        for loaded in &mut definitions {
            config.log(format!("Initializing model id: {}", loaded.id));

            let model = loader.require_model(&loaded.id)?;
            loaded
                .definition
                .initialize(loader, model, &config.model_initialize_args)?;
        }

        tracing::debug!(models = self.models.len(), "Models loaded");
        Ok(())
    }

    /// Catalog entries in registration order, then declared files from the
    /// models path, minus ignored keys. A declared file replaces a catalog
    /// entry with the same key.
    fn discover<'a>(
        config: &Config,
        catalog: &'a DefinitionCatalog<C>,
    ) -> Result<IndexMap<String, Source<'a, C>>> {
        let mut sources: IndexMap<String, Source<'a, C>> = catalog
            .iter()
            .map(|(key, factory)| (key.to_string(), Source::Factory(factory)))
            .collect();

        if let Some(path) = &config.models_path {
            config.log(format!("Loading models from path: {}", path.display()));

            for (key, definition) in discover_definitions(path)? {
                sources.insert(key, Source::Declared(Box::new(definition)));
            }
        }

        sources.retain(|key, _| !config.is_ignored(key));
        Ok(sources)
    }

    fn instantiate(
        &self,
        config: &Config,
        sources: IndexMap<String, Source<'_, C>>,
    ) -> Result<Vec<Loaded<C>>> {
        let args: &[Value] = &config.model_constructor_args;
        let mut definitions = Vec::with_capacity(sources.len());

        for (key, source) in sources {
            let definition = match source {
                Source::Factory(factory) => factory(self, args)?,
                Source::Declared(definition) => definition,
            };

            let id = resolve_identifier(&key, definition.as_ref())?;
            if config.is_ignored(&id) {
                tracing::debug!(key = %key, model = %id, "Skipping ignored model");
                continue;
            }

            definitions.push(Loaded { id, definition });
        }

        Ok(definitions)
    }
}
