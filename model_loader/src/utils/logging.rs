//! Logging utilities for model_loader
//!
//! This module installs a global `tracing` subscriber from the `[logging]`
//! section of the configuration, or from [`LoggingConfig::default`] when the
//! section is absent.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Initialize logging based on configuration
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<()> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let subscriber = if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        build_subscriber(config, Mutex::new(File::create(file_path)?), false)?
    } else if config.stdout {
        build_subscriber(config, std::io::stdout, true)?
    } else {
        return Ok(());
    };

    tracing::subscriber::set_global_default(subscriber).map_err(|e| Error::Unknown(e.to_string()))
}

fn build_subscriber<W>(config: &LoggingConfig, writer: W, ansi: bool) -> Result<BoxedSubscriber>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let level = parse_level(&config.level);
    let directive = format!("model_loader={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi);

    if config.format.eq_ignore_ascii_case("json") {
        Ok(Box::new(builder.json().finish()))
    } else {
        Ok(Box::new(builder.finish()))
    }
}

/// Unknown names fall back to info
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
