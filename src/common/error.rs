//! Error types for shardcache

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    #[error("invalid key")]
    InvalidKey,

    #[error("invalid value")]
    InvalidValue,

    // === Config Errors ===
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // === Routing Errors ===
    #[error("no nodes available")]
    NoNodesAvailable,

    #[error("client not found for node {0}")]
    ClientNotFound(String),

    // === Backend Errors ===
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("all {total} clients unhealthy: {source}")]
    AllNodesUnhealthy {
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("pool is closed")]
    PoolClosed,

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // === Deadlines ===
    #[error("operation timeout: {0}")]
    Timeout(String),

    #[error("operation cancelled")]
    Cancelled,

    // === Transport ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this a retryable error?
    ///
    /// The router itself never retries; this is advice for callers and pools.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::CacheUnavailable(_) | Error::NoNodesAvailable => true,
            Error::Redis(e) => e.is_timeout() || e.is_connection_dropped() || e.is_io_error(),
            _ => false,
        }
    }

    /// Caller supplied bad input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidKey | Error::InvalidValue)
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::KeyNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidKey | Error::InvalidValue => StatusCode::BAD_REQUEST,
            Error::NoNodesAvailable
            | Error::ClientNotFound(_)
            | Error::CacheUnavailable(_)
            | Error::AllNodesUnhealthy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable outward message. Backend details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::KeyNotFound(_) => "key not found",
            Error::InvalidKey => "invalid key",
            Error::InvalidValue => "invalid value",
            Error::NoNodesAvailable => "no nodes available",
            Error::ClientNotFound(_) => "client not found",
            Error::CacheUnavailable(_) | Error::AllNodesUnhealthy { .. } => "cache unavailable",
            Error::Timeout(_) => "request timeout",
            _ => "internal server error",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
