//! cxnet CLI - admin surface for the club site content store

use clap::{Parser, Subcommand};
use cxnet::config::{self, BackendKind, Settings};
use cxnet::output::{emit_error, OutputMode};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "cxnet")]
#[command(version)]
#[command(about = "Club site content store - resources, coding links, events and the message board")]
#[command(long_about = r#"
cxnet manages the content behind the club website, stored either locally
(one JSON blob in a SQLite key-value file) or in hosted object storage.

Example usage:
  cxnet init
  cxnet list resources
  cxnet add events --set title="Spring Hackathon" --img-file poster.png
  cxnet post --name A --content hello
  cxnet export --out backups/
  cxnet serve --port 8080
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(short, long, global = true, value_enum)]
    backend: Option<BackendKind>,

    /// Override the local database path
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter cxnet.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show the version
    Version,

    /// Count records per collection
    Stats,

    /// List the records of a collection
    List {
        /// resources, coding, events or messages
        collection: String,
    },

    /// Add a record
    Add {
        collection: String,

        /// Field assignment, repeatable (title=..., link=...)
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,

        /// Inline an image file into the `img` field
        #[arg(long)]
        img_file: Option<PathBuf>,
    },

    /// Overwrite fields of a record
    Edit {
        collection: String,

        /// Record id (position for the local backend, objectId for remote)
        id: String,

        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,

        #[arg(long)]
        img_file: Option<PathBuf>,
    },

    /// Delete a record
    Remove { collection: String, id: String },

    /// Post to the message board
    Post {
        /// Author (optional)
        #[arg(short, long, default_value = "")]
        name: String,

        #[arg(long)]
        content: String,
    },

    /// Like a message
    Like { id: String },

    /// Export the local dataset
    Export {
        /// File or directory; directories receive cxnet_data_backup.json
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Replace the local dataset from a backup file
    Import { file: PathBuf },

    /// Restore the default dataset
    Reset,

    /// Serve the JSON API and the static pages
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Directory of static pages (defaults to the configured one)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Version => "version",
            Commands::Stats => "stats",
            Commands::List { .. } => "list",
            Commands::Add { .. } => "add",
            Commands::Edit { .. } => "edit",
            Commands::Remove { .. } => "remove",
            Commands::Post { .. } => "post",
            Commands::Like { .. } => "like",
            Commands::Export { .. } => "export",
            Commands::Import { .. } => "import",
            Commands::Reset => "reset",
            Commands::Serve { .. } => "serve",
        }
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let file = config::load_config(cli.config.as_deref())?;
    let mut settings = Settings::resolve(file.as_ref(), |name| std::env::var(name).ok())?;

    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(database) = &cli.database {
        settings.database = database.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = OutputMode::from_flag(cli.json);
    let command_name = cli.command.name();

    let result = match load_settings(&cli) {
        Ok(settings) => commands::run(cli.command, &settings, cli.config.as_deref(), output_mode).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if output_mode.is_human() {
            return Err(e);
        }
        emit_error(command_name, &e)?;
        std::process::exit(1);
    }

    Ok(())
}
