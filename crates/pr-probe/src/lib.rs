//! Latency probing over parsed proxy profiles.
//!
//! The pipeline here is: validate descriptors through a [`ProxyEngine`],
//! tag the survivors, probe them concurrently for a configured number of
//! rounds, and rank what remains by measured delay. Everything protocol
//! specific hides behind the engine boundary; the built-in
//! [`TcpProbeEngine`] measures TCP reachability of the proxy endpoint.

pub mod engine;
pub mod error;
pub mod latency;
pub mod rounds;
pub mod validate;

#[cfg(test)]
mod testing;

pub use engine::{Dialer, IoStream, ProxyEngine, TcpProbeEngine};
pub use error::{EngineError, ProbeError};
pub use latency::{probe, Candidate, LatencyResult, ProbeEvent, ProbeSettings};
pub use rounds::{rank, reassociate, run_rounds, ProgressSink, RoundPlan};
pub use validate::{validate_and_tag, ValidationOutcome};
