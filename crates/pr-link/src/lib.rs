//! Share-link parsing for proxy subscription feeds.
//!
//! Turns loosely formatted connection URIs (`vless`, `trojan`, `vmess`,
//! `ss`, `hysteria2`/`hy2`) into typed outbound descriptors: a repair pass
//! over the raw URI ([`fixer`]), scheme dispatch into per-protocol parsers
//! ([`parser`]), and order-preserving deduplication of raw lines ([`dedup`]).

mod common;
pub mod dedup;
mod error;
pub mod fixer;
pub mod model;
pub mod parser;

pub use error::{LinkError, Result};
pub use model::{OutboundDescriptor, Profile};
pub use parser::parse_profile;
