use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod sync;
mod workspace;

use commands::{
    ActivityCommand, ClientCommand, ConfigCommand, DocumentCommand, ExpenseCommand,
    NotificationCommand, ReceiptCommand, WatchCommand,
};
use config::Config;
use db::init_db;
use workspace::Workspace;

#[derive(Parser)]
#[command(name = "arkive")]
#[command(version)]
#[command(about = "Client, receipt and document records for a tax practice", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage clients
    Client(ClientCommand),

    /// Manage payment receipts
    Receipt(ReceiptCommand),

    /// Manage office expenses
    Expense(ExpenseCommand),

    /// Read and post notifications
    Notification(NotificationCommand),

    /// Manage client documents
    Document(DocumentCommand),

    /// Show the activity log
    Activity(ActivityCommand),

    /// Follow the remote feed
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arkive=warn,arkive_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&mut config),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let pool = init_db(&config.database_path.value).await?;
    let mut workspace = Workspace::new(pool, config.sync.merge_policy);
    workspace.initialize().await;

    match command {
        Commands::Client(cmd) => cmd.run(&workspace, &config).await?,
        Commands::Receipt(cmd) => cmd.run(&workspace, &config).await?,
        Commands::Expense(cmd) => cmd.run(&workspace, &config).await?,
        Commands::Notification(cmd) => cmd.run(&workspace).await?,
        Commands::Document(cmd) => cmd.run(&workspace, &config).await?,
        Commands::Activity(cmd) => cmd.run(&workspace).await?,
        Commands::Watch(cmd) => cmd.run(&mut workspace, &config).await?,
        Commands::Config(cmd) => cmd.run(&mut config)?,
    }

    Ok(())
}
