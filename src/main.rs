use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, DocsCommand, StatsCommand, SyncCommand, TreeCommand, VaultCommand};
use remarkidian::db::VaultRepository;
use remarkidian::{init_db, Config};

#[derive(Parser)]
#[command(name = "remarkidian")]
#[command(version)]
#[command(about = "Mirror a document cloud account into note vaults", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage vaults
    Vault(VaultCommand),

    /// Run syncs and inspect sync history
    Sync(SyncCommand),

    /// Show item counts for a vault
    Stats(StatsCommand),

    /// Print a vault's folder tree
    Tree(TreeCommand),

    /// Work with documents awaiting processing
    Docs(DocsCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remarkidian=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Vault(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&VaultRepository::new(pool)).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool, &config).await?;
        }
        Some(Commands::Stats(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool).await?;
        }
        Some(Commands::Tree(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool).await?;
        }
        Some(Commands::Docs(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
