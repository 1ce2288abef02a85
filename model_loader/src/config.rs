//! Configuration handling for model_loader
//!
//! A [`RawConfig`] is what callers and config files provide; every key is
//! optional. [`Config`] is the normalized form the loader works with, where
//! each absent key has been replaced by its default. Defaults are applied per
//! key only: a supplied section replaces the default section whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Receives human readable lifecycle messages when `debug` is enabled
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// The sink used when none is configured: forwards to `tracing` at info level
pub fn default_log_sink() -> LogSink {
    Arc::new(|message: &str| tracing::info!(target: "model_loader", "{}", message))
}

/// Load configuration from a TOML file and normalize it
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let raw: RawConfig = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e)))?;

    Ok(parse_config(raw))
}

/// Fill every absent key of a raw configuration with its default
pub fn parse_config(raw: RawConfig) -> Config {
    Config {
        debug: raw.debug.unwrap_or(false),
        log: raw.log.unwrap_or_else(default_log_sink),
        ignore_models: raw.ignore_models.unwrap_or_default().into_iter().collect(),
        model_constructor_args: raw.model_constructor_args.unwrap_or_default(),
        model_initialize_args: raw.model_initialize_args.unwrap_or_default(),
        models_path: raw.models_path,
        database: raw.database,
        type_mapping: raw.type_mapping.unwrap_or_default(),
        logging: raw.logging,
    }
}

/// Possibly partial configuration as supplied by the caller
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    pub debug: Option<bool>,

    #[serde(skip)]
    pub log: Option<LogSink>,

    #[serde(alias = "ignoreModels")]
    pub ignore_models: Option<Vec<String>>,

    #[serde(alias = "modelConstructorArgs")]
    pub model_constructor_args: Option<Vec<Value>>,

    #[serde(alias = "modelInitializeArgs")]
    pub model_initialize_args: Option<Vec<Value>>,

    #[serde(alias = "modelsPath")]
    pub models_path: Option<PathBuf>,

    #[serde(alias = "thinky")]
    pub database: Option<DatabaseConfig>,

    pub type_mapping: Option<TypeMappingConfig>,
    pub logging: Option<LoggingConfig>,
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("debug", &self.debug)
            .field("log", &self.log.as_ref().map(|_| "<sink>"))
            .field("ignore_models", &self.ignore_models)
            .field("model_constructor_args", &self.model_constructor_args)
            .field("model_initialize_args", &self.model_initialize_args)
            .field("models_path", &self.models_path)
            .field("database", &self.database)
            .field("type_mapping", &self.type_mapping)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Normalized configuration: every recognized option has a value
#[derive(Clone)]
pub struct Config {
    pub debug: bool,
    pub log: LogSink,
    pub ignore_models: HashSet<String>,
    pub model_constructor_args: Vec<Value>,
    pub model_initialize_args: Vec<Value>,
    pub models_path: Option<PathBuf>,
    pub database: Option<DatabaseConfig>,
    pub type_mapping: TypeMappingConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Send a lifecycle message to the sink if debug output is enabled
    pub fn log(&self, message: impl AsRef<str>) {
        if self.debug {
            (self.log)(message.as_ref());
        }
    }

    /// Whether a definition key or model id is excluded from loading
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_models.contains(name)
    }
}

impl Default for Config {
    fn default() -> Self {
        parse_config(RawConfig::default())
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        parse_config(raw)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("debug", &self.debug)
            .field("ignore_models", &self.ignore_models)
            .field("model_constructor_args", &self.model_constructor_args)
            .field("model_initialize_args", &self.model_initialize_args)
            .field("models_path", &self.models_path)
            .field("database", &self.database)
            .field("type_mapping", &self.type_mapping)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[serde(alias = "postgresql")]
    Postgres,
    Mysql,
    Sqlite,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Driver::Postgres => "postgres",
            Driver::Mysql => "mysql",
            Driver::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub driver: Driver,
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Type mapping configuration
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct TypeMappingConfig {
    pub custom: Option<Vec<CustomTypeMapping>>,
    #[serde(rename = "override")]
    pub override_: Option<HashMap<String, String>>,
}

/// Custom type mapping
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomTypeMapping {
    pub field_type: String,
    pub db_type: String,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_stdout")]
    pub stdout: bool,
}

impl Default for LoggingConfig {
    /// Text output to stdout at info level
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: default_log_format(),
            stdout: default_stdout(),
        }
    }
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_stdout() -> bool {
    true
}
