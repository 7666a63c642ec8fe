use std::time::Duration;

use thiserror::Error;

/// Why a single probe failed. Recovered locally per task; never fatal to a
/// run, it only removes the profile from the next round's candidate set.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("canceled")]
    Canceled,

    #[error("io: {0}")]
    Io(String),
}

/// Engine-side rejection of a descriptor or dialer request.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("missing server address")]
    MissingServer,

    #[error("invalid server port")]
    InvalidPort,

    #[error("malformed uuid {0}")]
    MalformedUuid(String),

    #[error("missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    Other(String),
}
