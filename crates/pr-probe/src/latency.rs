//! Concurrent latency probing: bounded fan-out, per-task timeout, fan-in.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::engine::{Dialer, ProxyEngine};
use crate::error::ProbeError;

/// Settings for one probing pass.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub test_url: String,
    /// Per-probe budget, independent per task.
    pub timeout: Duration,
    /// Worker-pool ceiling for simultaneous in-flight probes.
    pub concurrency: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            test_url: "https://www.google.com/generate_204".to_string(),
            timeout: Duration::from_secs(20),
            concurrency: 64,
        }
    }
}

/// One candidate entering a probing pass: the tag correlates the result back
/// to its profile, the dialer is the engine-owned handle being measured.
#[derive(Clone)]
pub struct Candidate {
    pub tag: String,
    pub dialer: Arc<dyn Dialer>,
}

/// Outcome of one probe. Successful iff `error` is `None`; `delay_ms` is
/// only meaningful then. Timeouts carry delay `-1`.
#[derive(Clone)]
pub struct LatencyResult {
    pub tag: String,
    pub delay_ms: i64,
    pub dialer: Arc<dyn Dialer>,
    pub error: Option<ProbeError>,
}

impl LatencyResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl std::fmt::Debug for LatencyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyResult")
            .field("tag", &self.tag)
            .field("delay_ms", &self.delay_ms)
            .field("error", &self.error)
            .finish()
    }
}

/// Per-probe completion event for live progress reporting.
#[derive(Debug, Clone, Copy)]
pub struct ProbeEvent {
    pub succeeded: bool,
}

/// Probe every candidate once and collect exactly one result per candidate.
///
/// Each task runs under an independent timeout nested below `cancel`; a
/// parent cancellation converts outstanding and queued probes into canceled
/// results rather than dropping them. Results come back in completion order;
/// callers impose ordering afterwards.
pub async fn probe(
    cancel: &CancellationToken,
    settings: &ProbeSettings,
    engine: Arc<dyn ProxyEngine>,
    candidates: Vec<Candidate>,
    progress: Option<mpsc::Sender<ProbeEvent>>,
) -> Vec<LatencyResult> {
    let total = candidates.len();
    if total == 0 {
        return Vec::new();
    }

    let semaphore = Arc::new(Semaphore::new(settings.concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel::<LatencyResult>(total);

    for candidate in candidates {
        let cancel = cancel.clone();
        let engine = engine.clone();
        let semaphore = semaphore.clone();
        let tx = tx.clone();
        let progress = progress.clone();
        let test_url = settings.test_url.clone();
        let timeout = settings.timeout;

        tokio::spawn(async move {
            let result = run_one(cancel, engine, semaphore, candidate, &test_url, timeout).await;

            if let Some(progress) = &progress {
                let _ = progress
                    .send(ProbeEvent {
                        succeeded: result.is_success(),
                    })
                    .await;
            }
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut results = Vec::with_capacity(total);
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}

async fn run_one(
    cancel: CancellationToken,
    engine: Arc<dyn ProxyEngine>,
    semaphore: Arc<Semaphore>,
    candidate: Candidate,
    test_url: &str,
    timeout: Duration,
) -> LatencyResult {
    let Candidate { tag, dialer } = candidate;

    // Queued tasks still observe cancellation.
    let permit = tokio::select! {
        permit = semaphore.acquire_owned() => permit,
        _ = cancel.cancelled() => {
            return failed(tag, dialer, ProbeError::Canceled);
        }
    };
    let _permit = match permit {
        Ok(p) => p,
        Err(_) => return failed(tag, dialer, ProbeError::Canceled),
    };

    // The per-probe timer is independent and non-renewable, nested under the
    // parent token: whichever resolves first produces the result.
    tokio::select! {
        outcome = tokio::time::timeout(timeout, engine.url_probe(dialer.as_ref(), test_url)) => {
            match outcome {
                Ok(Ok(ms)) => {
                    tracing::trace!(tag = %tag, delay_ms = ms, "probe ok");
                    LatencyResult { tag, delay_ms: ms as i64, dialer, error: None }
                }
                Ok(Err(e)) => {
                    tracing::trace!(tag = %tag, error = %e, "probe failed");
                    failed(tag, dialer, e)
                }
                Err(_) => failed(tag, dialer, ProbeError::Timeout(timeout)),
            }
        }
        _ = cancel.cancelled() => failed(tag, dialer, ProbeError::Canceled),
    }
}

fn failed(tag: String, dialer: Arc<dyn Dialer>, error: ProbeError) -> LatencyResult {
    LatencyResult {
        tag,
        delay_ms: -1,
        dialer,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEngine, Script};

    fn settings(timeout_ms: u64, concurrency: usize) -> ProbeSettings {
        ProbeSettings {
            test_url: "http://probe.test/generate_204".to_string(),
            timeout: Duration::from_millis(timeout_ms),
            concurrency,
        }
    }

    #[tokio::test]
    async fn one_result_per_candidate() {
        let engine = MockEngine::new([
            ("outbound-0", Script::Delay(5)),
            ("outbound-1", Script::Fail),
            ("outbound-2", Script::Delay(1)),
        ]);
        let candidates = engine.candidates();
        let cancel = CancellationToken::new();

        let results = probe(&cancel, &settings(500, 8), Arc::new(engine), candidates, None).await;
        assert_eq!(results.len(), 3);
        let mut tags: Vec<_> = results.iter().map(|r| r.tag.clone()).collect();
        tags.sort();
        assert_eq!(tags, ["outbound-0", "outbound-1", "outbound-2"]);
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 2);
    }

    #[tokio::test]
    async fn bounded_pool_still_covers_every_candidate() {
        let engine = MockEngine::new(
            (0..10)
                .map(|i| (format!("outbound-{i}"), Script::Delay(1)))
                .collect::<Vec<_>>(),
        );
        let candidates = engine.candidates();
        let cancel = CancellationToken::new();

        // concurrency far below candidate count
        let results = probe(&cancel, &settings(500, 2), Arc::new(engine), candidates, None).await;
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.is_success()));
    }

    #[tokio::test]
    async fn hung_probe_times_out_with_negative_delay() {
        let engine = MockEngine::new([("outbound-0", Script::Hang)]);
        let candidates = engine.candidates();
        let cancel = CancellationToken::new();

        let results = probe(&cancel, &settings(50, 4), Arc::new(engine), candidates, None).await;
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.delay_ms, -1);
        assert!(matches!(r.error, Some(ProbeError::Timeout(_))));
    }

    #[tokio::test]
    async fn parent_cancellation_converts_outstanding_probes() {
        let engine = MockEngine::new([
            ("outbound-0", Script::Hang),
            ("outbound-1", Script::Hang),
        ]);
        let candidates = engine.candidates();
        let cancel = CancellationToken::new();

        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });

        let results = probe(
            &cancel,
            &settings(60_000, 4),
            Arc::new(engine),
            candidates,
            None,
        )
        .await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r.error, Some(ProbeError::Canceled))));
    }

    #[tokio::test]
    async fn progress_stream_sees_every_completion() {
        let engine = MockEngine::new([
            ("outbound-0", Script::Delay(1)),
            ("outbound-1", Script::Fail),
        ]);
        let candidates = engine.candidates();
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(8);

        let results = probe(
            &cancel,
            &settings(500, 4),
            Arc::new(engine),
            candidates,
            Some(tx),
        )
        .await;
        assert_eq!(results.len(), 2);

        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events.iter().filter(|e| e.succeeded).count(), 1);
    }
}
