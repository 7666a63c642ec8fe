//! `fetch` command: download subscriptions into a local link list.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args as ClapArgs;
use pr_link::dedup::dedupe;

use crate::download;

#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    /// Subscription URLs to download
    #[arg(required_unless_present = "list")]
    pub urls: Vec<String>,

    /// File with one subscription URL per line; # comments skipped
    #[arg(long)]
    pub list: Option<PathBuf>,

    /// File the combined link list is written to
    #[arg(long, short, default_value = "subscription.txt")]
    pub output: PathBuf,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,
}

fn collect_urls(args: &FetchArgs) -> Result<Vec<String>> {
    let mut urls = args.urls.clone();
    if let Some(list) = &args.list {
        let raw = std::fs::read_to_string(list)
            .with_context(|| format!("reading {} failed", list.display()))?;
        urls.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    Ok(urls)
}

pub async fn run(args: FetchArgs) -> Result<()> {
    let urls = collect_urls(&args)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(args.timeout_ms))
        .user_agent(concat!("proxy-ranker/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client failed")?;

    let mut links = Vec::new();
    for url in &urls {
        match download::fetch_one(&client, url).await {
            Ok(mut found) => {
                tracing::info!(url = %url, links = found.len(), "subscription downloaded");
                links.append(&mut found);
            }
            // One dead subscription must not sink the others.
            Err(e) => tracing::warn!(url = %url, error = %e, "subscription skipped"),
        }
    }

    if links.is_empty() {
        bail!("no links downloaded from any subscription");
    }
    let unique = dedupe(links);

    let mut body = unique.join("\n");
    body.push('\n');
    std::fs::write(&args.output, body)
        .with_context(|| format!("writing {} failed", args.output.display()))?;
    tracing::info!(links = unique.len(), output = %args.output.display(), "wrote link list");
    Ok(())
}
