use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use abyss::config::Config;
use abyss::db::init_db;
use commands::{ConfigCommand, PostCommand, SitemapCommand, UserCommand};

#[derive(Parser)]
#[command(name = "abyss")]
#[command(version)]
#[command(about = "Manage abyss blog users and posts", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User(UserCommand),

    /// Manage posts
    Post(PostCommand),

    /// Print the sitemap of published posts
    Sitemap(SitemapCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abyss=warn".into()),
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

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::User(cmd)) => {
            let repo = init_db(&config.database_path.value).await?;
            cmd.run(&repo).await?;
        }
        Some(Commands::Post(cmd)) => {
            let repo = init_db(&config.database_path.value).await?;
            cmd.run(&repo).await?;
        }
        Some(Commands::Sitemap(cmd)) => {
            let repo = init_db(&config.database_path.value).await?;
            cmd.run(&repo, &config).await?;
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
