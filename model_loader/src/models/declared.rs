//! Declared model definitions
//!
//! A declared definition is a model described in a data file instead of
//! code. [`discover_definitions`] reads every TOML, JSON or YAML file sitting
//! directly in a directory; the file stem becomes the definition key, the way
//! a module name would.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::db::client::ModelClient;
use crate::error::{Error, Result};
use crate::models::definition::Definition;
use crate::models::loader::Loader;
use crate::schema::{ModelOptions, Relation, Schema};

/// File names picked up by discovery; matching is case-sensitive
static DEFINITION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)\.(toml|json|ya?ml)$").expect("definition file pattern is valid"));

/// A model definition read from a data file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredDefinition {
    #[serde(default, alias = "tableName")]
    pub table_name: Option<String>,
    #[serde(default, alias = "globalId")]
    pub global_id: Option<String>,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub options: Option<ModelOptions>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl DeclaredDefinition {
    /// Parse a definition file, choosing the format from its extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

        let parsed: std::result::Result<Self, String> = match extension {
            "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            other => {
                return Err(Error::DiscoveryError(format!(
                    "Unsupported definition format `{}`: {}",
                    other,
                    path.display()
                )))
            }
        };

        parsed.map_err(|e| Error::SerializationError(format!("{}: {}", path.display(), e)))
    }
}

impl<C: ModelClient> Definition<C> for DeclaredDefinition {
    fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    fn global_id(&self) -> Option<&str> {
        self.global_id.as_deref()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn options(&self) -> Option<&ModelOptions> {
        self.options.as_ref()
    }

    /// Wire every declared relation through the client
    fn initialize(&mut self, loader: &Loader<C>, model: &C::Model, _args: &[Value]) -> Result<()> {
        for relation in &self.relations {
            let target = loader.require_model(&relation.model)?;
            loader.client().relate(model, relation, target)?;
        }
        Ok(())
    }
}

/// Read every definition file directly inside `dir`, in file name order
pub fn discover_definitions(dir: &Path) -> Result<IndexMap<String, DeclaredDefinition>> {
    if !dir.is_dir() {
        return Err(Error::DiscoveryError(format!(
            "Models path is not a directory: {}",
            dir.display()
        )));
    }

    let mut definitions = IndexMap::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::DiscoveryError(format!("{}: {}", dir.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(captures) = DEFINITION_FILE.captures(file_name) else {
            continue;
        };

        let key = captures[1].to_string();
        let definition = DeclaredDefinition::from_file(entry.path())?;
        tracing::debug!(key = %key, path = %entry.path().display(), "Discovered definition file");

        definitions.insert(key, definition);
    }

    Ok(definitions)
}
