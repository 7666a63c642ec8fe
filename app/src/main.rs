use clap::Parser;
use pr_app::{cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;

    let args = cli::Args::parse();
    match args.command {
        cli::Commands::Fetch(a) => cli::fetch::run(a).await,
        cli::Commands::Rank(a) => cli::rank::run(a).await,
    }
}
