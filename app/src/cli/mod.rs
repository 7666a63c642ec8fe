pub mod fetch;
pub mod rank;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "proxy-ranker")]
#[command(about = "Download proxy subscriptions and rank profiles by latency", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download subscription link lists
    Fetch(fetch::FetchArgs),
    /// Parse, probe, and rank profiles from a link list
    Rank(rank::RankArgs),
}
