//! proxy-ranker application: subscription download, parsing, latency
//! probing, and ranked output.

pub mod cli;
pub mod download;
pub mod logging;
pub mod pipeline;
pub mod stats;
