mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_indexer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let root = cli.root.as_path();

    match cli.command {
        Commands::Cost => cli::cost(root)?,
        Commands::Generate {
            force,
            concurrency,
            yes,
        } => cli::generate(root, force, concurrency, yes).await?,
        Commands::Update { force, concurrency } => cli::update(root, force, concurrency).await?,
        Commands::Query {
            text,
            limit,
            doc_type,
            language,
            file,
        } => cli::query(root, &text, limit, doc_type, language, file).await?,
        Commands::Stats => cli::stats(root).await?,
    }

    Ok(())
}
