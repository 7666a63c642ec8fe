//! Live progress line for probing rounds.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pr_probe::{ProbeEvent, ProgressSink};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Renders a single in-place status line on stderr per round, redrawn with
/// `\r` on every completed probe, plus a summary line when the round ends.
///
/// `round_finished` joins the round's drain task, so all of a round's output
/// is flushed before the controller moves on to the next round's header.
#[derive(Debug, Default)]
pub struct StatsPrinter {
    drain: Mutex<Option<JoinHandle<()>>>,
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl ProgressSink for StatsPrinter {
    async fn round_started(
        &self,
        round: usize,
        rounds: usize,
        candidates: usize,
    ) -> Option<mpsc::Sender<ProbeEvent>> {
        eprintln!("Round {round}/{rounds}: probing {candidates} profiles");

        let (tx, mut rx) = mpsc::channel::<ProbeEvent>(candidates.max(1));
        let seen = self.seen.clone();
        let handle = tokio::spawn(async move {
            let mut done = 0usize;
            let mut succeeded = 0usize;
            while let Some(event) = rx.recv().await {
                done += 1;
                seen.fetch_add(1, Ordering::SeqCst);
                if event.succeeded {
                    succeeded += 1;
                }
                eprint!(
                    "\rRunning: {} | Succeeded: {} | Failed: {} | Total: {}",
                    candidates - done,
                    succeeded,
                    done - succeeded,
                    candidates
                );
                let _ = std::io::stderr().flush();
            }
            // Channel closes when the round's probes are all accounted for.
            eprintln!();
        });
        *self.drain.lock().await = Some(handle);
        Some(tx)
    }

    async fn round_finished(&self, round: usize, survivors: usize) {
        if let Some(handle) = self.drain.lock().await.take() {
            let _ = handle.await;
        }
        tracing::info!(
            round,
            survivors,
            events = self.seen.load(Ordering::SeqCst),
            "round finished"
        );
    }
}
