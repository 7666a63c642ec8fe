//! End-to-end ranking pipeline: read links, dedup, parse, validate, probe
//! over rounds, rank, write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pr_link::{dedup::dedupe, parse_profile, Profile};
use pr_probe::{rank, reassociate, run_rounds, validate_and_tag, ProgressSink, ProxyEngine, RoundPlan};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub plan: RoundPlan,
}

/// Run the whole pipeline. Individual bad links and failed probes are
/// tolerated and tallied; an empty stage result or an output write failure
/// aborts with an error.
pub async fn run(
    cancel: &CancellationToken,
    opts: &PipelineOptions,
    engine: Arc<dyn ProxyEngine>,
    progress: Option<&dyn ProgressSink>,
) -> Result<()> {
    let links = read_links(&opts.input)?;
    let total = links.len();
    let unique = dedupe(links);
    tracing::info!(
        total,
        unique = unique.len(),
        input = %opts.input.display(),
        "loaded subscription links"
    );

    let profiles = parse_links(&unique);
    if profiles.is_empty() {
        bail!("no usable profiles in {}", opts.input.display());
    }

    let outcome = validate_and_tag(engine.as_ref(), profiles);
    for (message, count) in &outcome.errors {
        tracing::warn!(count, "validation rejected: {message}");
    }
    if outcome.profiles.is_empty() {
        bail!("no profiles passed validation");
    }

    let survivors = run_rounds(cancel, &opts.plan, engine, &outcome.profiles, progress).await;
    let ranked = rank(survivors);
    if ranked.is_empty() {
        bail!("no profiles survived probing");
    }

    for result in &ranked {
        tracing::debug!(tag = %result.tag, delay_ms = result.delay_ms, "ranked");
    }

    let uris = reassociate(&ranked, &outcome.profiles);
    let mut body = uris.join("\n");
    body.push('\n');
    std::fs::write(&opts.output, body)
        .with_context(|| format!("writing {} failed", opts.output.display()))?;
    tracing::info!(written = uris.len(), output = %opts.output.display(), "wrote ranked profiles");
    Ok(())
}

fn read_links(input: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {} failed", input.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Parse every link, keeping survivors and logging a frequency tally of the
/// failures.
fn parse_links(links: &[String]) -> Vec<Profile> {
    let mut profiles = Vec::with_capacity(links.len());
    let mut errors: HashMap<String, usize> = HashMap::new();

    for link in links {
        match parse_profile(link) {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                *errors.entry(e.to_string()).or_insert(0) += 1;
            }
        }
    }
    for (message, count) in &errors {
        tracing::warn!(count, "parse rejected: {message}");
    }
    tracing::info!(parsed = profiles.len(), rejected = links.len() - profiles.len(), "parsed links");
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_links_tallies_failures() {
        let links = vec![
            "trojan://pw@a:443#x".to_string(),
            "bogus://y".to_string(),
            "bogus://z".to_string(),
        ];
        let profiles = parse_links(&links);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].descriptor.protocol(), "trojan");
    }

    #[test]
    fn read_links_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.txt");
        std::fs::write(&path, "# header\ntrojan://pw@a:443#x\n\n  \n").unwrap();
        let links = read_links(&path).unwrap();
        assert_eq!(links, ["trojan://pw@a:443#x"]);
    }
}
