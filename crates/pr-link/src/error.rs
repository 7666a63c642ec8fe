use thiserror::Error;

pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Errors produced while normalizing and parsing connection URIs.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("empty configuration URI")]
    EmptyInput,

    #[error("failed to split URI by scheme")]
    MalformedScheme,

    #[error("unknown profile URI scheme {0}")]
    UnknownScheme(String),

    /// Scheme-specific structural failure, wrapping the underlying cause.
    #[error("{scheme}: {msg}")]
    Parse { scheme: &'static str, msg: String },

    #[error("unsupported security parameter {0}")]
    UnsupportedSecurity(String),

    #[error("transport {0} unsupported")]
    UnsupportedTransport(String),

    #[error("unknown transport {0}")]
    UnknownTransport(String),

    #[error("malformed credentials: {0}")]
    MalformedCredentials(&'static str),

    #[error("invalid port")]
    InvalidPort,

    #[error("cannot parse netloc for endpoint")]
    MalformedNetloc,

    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url: {0}")]
    Url(#[from] url::ParseError),
}
