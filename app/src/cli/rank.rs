//! `rank` command: probe a link list and write the ranked survivors.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args as ClapArgs;
use pr_probe::{ProbeSettings, ProgressSink, RoundPlan, TcpProbeEngine};
use tokio_util::sync::CancellationToken;

use crate::pipeline::{self, PipelineOptions};
use crate::stats::StatsPrinter;

#[derive(ClapArgs, Debug)]
pub struct RankArgs {
    /// Link list to rank, one URI per line
    #[arg(long, short)]
    pub input: PathBuf,

    /// File the ranked URIs are written to
    #[arg(long, short, default_value = "ranked.txt")]
    pub output: PathBuf,

    /// Number of probing rounds
    #[arg(long, default_value_t = 3)]
    pub rounds: usize,

    /// Per-probe timeout in milliseconds
    #[arg(long, default_value_t = 20_000)]
    pub timeout_ms: u64,

    /// Maximum simultaneous in-flight probes
    #[arg(long, default_value_t = 64)]
    pub concurrency: usize,

    /// URL each probe targets
    #[arg(long, default_value = "https://www.google.com/generate_204")]
    pub test_url: String,

    /// Suppress the live progress line
    #[arg(long)]
    pub quiet: bool,
}

pub async fn run(args: RankArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, canceling probes");
            ctrl_c.cancel();
        }
    });

    let opts = PipelineOptions {
        input: args.input,
        output: args.output,
        plan: RoundPlan {
            rounds: args.rounds,
            settings: ProbeSettings {
                test_url: args.test_url,
                timeout: Duration::from_millis(args.timeout_ms),
                concurrency: args.concurrency,
            },
        },
    };

    let printer = StatsPrinter::default();
    let progress: Option<&dyn ProgressSink> = if args.quiet { None } else { Some(&printer) };
    pipeline::run(&cancel, &opts, Arc::new(TcpProbeEngine), progress).await
}
