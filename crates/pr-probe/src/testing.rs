//! Scripted engine used by the unit tests in this crate.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pr_link::model::OutboundDescriptor;

use crate::engine::{Dialer, IoStream, ProxyEngine};
use crate::error::{EngineError, ProbeError};
use crate::latency::{Candidate, LatencyResult};

/// What a scripted dialer does when probed.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Succeed after roughly this many milliseconds.
    Delay(u64),
    /// Fail immediately.
    Fail,
    /// Never return; only a timeout or cancellation resolves the probe.
    Hang,
}

pub struct MockEngine {
    scripts: Vec<(String, Script)>,
    probes: AtomicUsize,
}

impl MockEngine {
    pub fn new<I, K>(scripts: I) -> Self
    where
        I: IntoIterator<Item = (K, Script)>,
        K: Into<String>,
    {
        Self {
            scripts: scripts.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            probes: AtomicUsize::new(0),
        }
    }

    /// Total `url_probe` calls observed so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Candidates whose tags are the script keys, in script order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.scripts
            .iter()
            .map(|(key, script)| Candidate {
                tag: key.clone(),
                dialer: Arc::new(MockDialer { script: *script }) as Arc<dyn Dialer>,
            })
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<Script> {
        self.scripts
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| *s)
    }
}

struct MockDialer {
    script: Script,
}

#[async_trait]
impl Dialer for MockDialer {
    async fn connect(&self, _host: &str, _port: u16) -> io::Result<IoStream> {
        match self.script {
            Script::Delay(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                let (a, _b) = tokio::io::duplex(8);
                Ok(Box::new(a))
            }
            Script::Fail => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "scripted")),
            Script::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ProxyEngine for MockEngine {
    fn validate(&self, descriptor: &OutboundDescriptor) -> Result<(), EngineError> {
        let (server, _) = descriptor.server();
        match self.lookup(server) {
            Some(_) => Ok(()),
            None => Err(EngineError::Other(format!("unscripted server {server}"))),
        }
    }

    fn dialer(&self, descriptor: &OutboundDescriptor) -> Result<Arc<dyn Dialer>, EngineError> {
        let (server, _) = descriptor.server();
        let script = self
            .lookup(server)
            .ok_or_else(|| EngineError::Other(format!("unscripted server {server}")))?;
        Ok(Arc::new(MockDialer { script }))
    }

    async fn url_probe(&self, dialer: &dyn Dialer, _url: &str) -> Result<u64, ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let start = std::time::Instant::now();
        let stream = dialer
            .connect("probe.test", 80)
            .await
            .map_err(|e| ProbeError::Io(e.to_string()))?;
        drop(stream);
        Ok(start.elapsed().as_millis() as u64)
    }
}

/// Hand-built result for ranking tests; `rank` never touches the dialer.
pub fn result(tag: &str, delay_ms: i64, success: bool) -> LatencyResult {
    LatencyResult {
        tag: tag.to_string(),
        delay_ms,
        dialer: Arc::new(MockDialer {
            script: Script::Delay(0),
        }),
        error: if success {
            None
        } else {
            Some(ProbeError::Io("scripted".to_string()))
        },
    }
}

/// `HashMap` of tag to delay for quick assertions in round tests.
pub fn delays_by_tag(results: &[LatencyResult]) -> HashMap<String, i64> {
    results
        .iter()
        .map(|r| (r.tag.clone(), r.delay_ms))
        .collect()
}
