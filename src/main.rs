use clap::{Parser, Subcommand};
use tripsure::Result;
use tripsure::commands::{ingest, serve, show_config};

#[derive(Parser)]
#[command(name = "tripsure")]
#[command(about = "Travel-insurance chatbot backend with retrieval-grounded answers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Embed stored insurance plans and upsert them into the remote vector index
    Ingest,
    /// Show the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve().await?,
        Commands::Ingest => ingest().await?,
        Commands::Config => show_config()?,
    }

    Ok(())
}
