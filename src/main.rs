use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard::config::{CliOverrides, DEFAULT_CONFIG_FILE, TaskboardToml};

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Kanban task board service")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(long, global = true, env = "TASKBOARD_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (CORS permissive for a local front-end dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and schema without starting the server
    Init {
        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Insert a demo board with sample tasks
    Seed {
        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default taskboard.toml
    Init,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            verbose: self.verbose,
            ..Default::default()
        };
        match &self.command {
            Commands::Serve {
                host,
                port,
                db_path,
                dev,
            } => {
                overrides.host = host.clone();
                overrides.port = *port;
                overrides.db_path = db_path.clone();
                overrides.dev = *dev;
            }
            Commands::Init { db_path } | Commands::Seed { db_path } => {
                overrides.db_path = db_path.clone();
            }
            Commands::Config { .. } => {}
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&cli.config, &cli.overrides(), command.clone());
    }

    let config = TaskboardToml::resolve(&cli.config, &cli.overrides())?;
    let _log_guard = taskboard::logging::init(
        &config.logging.level,
        config.logging.format,
        config.logging.dir.as_deref(),
    )?;
    tracing::debug!(config = ?config, "resolved configuration");

    match &cli.command {
        Commands::Serve { .. } => cmd::cmd_serve(&config).await?,
        Commands::Init { .. } => cmd::cmd_init(&config)?,
        Commands::Seed { .. } => cmd::cmd_seed(&config)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
