//! seqid - allocate sequenced, namespaced identifiers.
//!
//! # Usage
//!
//! ```bash
//! # Which namespace does a project get?
//! seqid namespace "Exam Portal"
//!
//! # Allocate the next identifier
//! seqid allocate "Exam Portal" --owner user-42 --entity tickets/981
//!
//! # Inspect
//! seqid next "Exam Portal"
//! seqid show EP-3
//! seqid list "Exam Portal" --format json
//!
//! # Configuration
//! seqid config init
//! seqid config show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use seqid_cli::{commands, output, OutputFormat};
use seqid_core::config::SeqIdConfig;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "seqid")]
#[command(about = "seqid - sequenced identifiers per project namespace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SEQID_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Output format (human, json)
    #[arg(long, global = true, default_value = "human")]
    format: OutputFormatArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the namespace derived from a project name
    Namespace {
        /// Project display name
        name: String,
    },

    /// Allocate the next identifier in a project's namespace
    Allocate {
        /// Project display name
        project: String,

        /// Id of the user requesting the identifier
        #[arg(short, long)]
        owner: String,

        /// Entity the identifier is issued for
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Preview the next identifier without allocating it
    Next {
        /// Project display name
        project: String,
    },

    /// Show a stored allocation
    Show {
        /// Identifier, e.g. EP-3
        identifier: String,
    },

    /// List allocations in a project's namespace
    List {
        /// Project display name
        project: String,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::error(format!("{:#}", e));
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format);

    match &cli.command {
        Commands::Namespace { name } => {
            load_config(&cli).await?;
            commands::namespace(name, format)?;
        }

        Commands::Allocate {
            project,
            owner,
            entity,
        } => {
            let config = load_config(&cli).await?;
            commands::allocate(&config, project, owner, entity.clone(), format).await?;
        }

        Commands::Next { project } => {
            let config = load_config(&cli).await?;
            commands::next(&config, project, format).await?;
        }

        Commands::Show { identifier } => {
            let config = load_config(&cli).await?;
            commands::show(&config, identifier, format).await?;
        }

        Commands::List { project } => {
            let config = load_config(&cli).await?;
            commands::list(&config, project, format).await?;
        }

        Commands::Config(ConfigCommands::Show) => {
            let config = load_config(&cli).await?;
            commands::config_show(&config, format)?;
        }

        // Runs without loading the existing file
        Commands::Config(ConfigCommands::Init { force }) => {
            init_logging(cli.verbose, "info");
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => SeqIdConfig::config_path()?,
            };
            commands::config_init(&path, *force).await?;
        }
    }

    Ok(())
}

/// Load the configuration and install logging at its level
async fn load_config(cli: &Cli) -> Result<SeqIdConfig> {
    let config = SeqIdConfig::load_or_default(cli.config.as_deref()).await?;
    init_logging(cli.verbose, &config.general.log_level);
    Ok(config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("seqid=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("seqid={},warn", level)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
