use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use model_loader::config::{self, Config};
use model_loader::models::{discover_definitions, resolve_identifier, Definition, DefinitionCatalog, Loader};
use model_loader::utils::init_logging;
use model_loader::{ModelClient, SqlModelClient};

#[derive(Parser)]
#[command(name = "model_loader", version, about = "Load declared model definitions into a database")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "model_loader.toml")]
    config: PathBuf,

    /// Print lifecycle messages while loading
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the definition files found in the models path
    List,
    /// Connect, load every definition and print the registered models
    Load {
        /// Create the tables of the loaded models
        #[arg(long)]
        sync: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.debug |= cli.debug;

    init_logging(config.logging.as_ref())?;

    match cli.command {
        Command::List => list(&config),
        Command::Load { sync } => load(&config, sync).await,
    }
}

fn list(config: &Config) -> Result<()> {
    let Some(path) = &config.models_path else {
        bail!("no models_path configured");
    };

    for (key, definition) in discover_definitions(path)? {
        let id = resolve_identifier::<SqlModelClient>(&key, &definition)?;
        let ignored = if config.is_ignored(&key) || config.is_ignored(&id) {
            " (ignored)"
        } else {
            ""
        };
        let fields = Definition::<SqlModelClient>::schema(&definition).fields.len();
        println!("{key}: {id}, {fields} fields{ignored}");
    }

    Ok(())
}

async fn load(config: &Config, sync: bool) -> Result<()> {
    let client = SqlModelClient::connect(config).await?;
    let mut loader = Loader::new(client);
    loader.load(config, &DefinitionCatalog::new()).await?;

    for (id, model) in loader.models() {
        let table = model.table()?;
        println!("{id}: {} columns, {} foreign keys", table.columns.len(), table.foreign_keys.len());
    }

    if sync {
        loader.sync_tables().await?;
        println!("synchronized {} models", loader.models().len());
    }

    Ok(())
}
