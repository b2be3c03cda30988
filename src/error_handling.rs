//! Error types and retry strategy for the scanning pipeline.
//!
//! Three families of failures are kept strictly apart (they have different
//! consumers):
//! - [`RejectReason`]: a URL that is not analyzable at all (malformed, blocked
//!   host, injected script pattern). Surfaced to the caller as "not analyzed".
//! - [`ProviderError`]: a single reputation provider attempt failing. Absorbed
//!   by the retry loop and ultimately translated to an `Unknown` outcome,
//!   never propagated.
//! - [`InitializationError`] / [`DatabaseError`] / [`AuditError`]: setup and
//!   storage failures, visible only at startup or in the audit sink's own log.

use std::time::Duration;

use log::SetLoggerError;
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// Error initializing the DNS resolver.
    #[error("DNS resolver initialization error: {0}")]
    #[allow(dead_code)] // Reserved for future use if fallback fails
    DnsResolverError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Error types for the encrypted audit log.
///
/// These never reach the scan path; the audit sink logs them internally.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The encryption key could not be loaded or persisted.
    #[error("Audit key error: {0}")]
    KeyError(String),

    /// Encryption or decryption of a record failed.
    #[error("Audit cipher error: {0}")]
    CipherError(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Key file I/O failure.
    #[error("Audit key file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a URL was rejected before analysis.
///
/// A rejection is not a verdict: rejected URLs are never sent to any provider
/// and never written to the audit log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The input was empty after trimming.
    #[error("empty URL")]
    Empty,

    /// The URL exceeds the maximum accepted length.
    #[error("URL exceeds maximum length ({0} chars)")]
    TooLong(usize),

    /// The URL contains a control character (code point below 0x20).
    #[error("URL contains a control character")]
    ControlCharacter,

    /// The URL matches a script/markup injection pattern.
    #[error("URL matches a script injection pattern")]
    SuspiciousPattern,

    /// The URL could not be parsed, or its host failed IDNA encoding.
    #[error("malformed URL")]
    Malformed,

    /// The URL scheme is not http or https.
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,

    /// The host resolves to a blocked (private/internal) address, or could
    /// not be resolved at all.
    #[error("blocked host '{0}'")]
    BlockedHost(String),

    /// The scan task was torn down before it could produce a result.
    /// Only seen during runtime shutdown.
    #[error("scan aborted")]
    Aborted,
}

/// A single reputation-provider attempt failing.
///
/// Only rate limiting (HTTP 429) and temporary unavailability (HTTP 503) are
/// retried; everything else degrades straight to an `Unknown` outcome.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered 429 or 503.
    #[error("provider throttled (HTTP {0})")]
    Throttled(u16),

    /// The provider answered with another non-success status.
    #[error("provider returned HTTP {0}")]
    Status(u16),

    /// Transport-level failure (timeout, connect, body).
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("provider response malformed: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether the attempt should be retried with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProviderError::Throttled(_))
    }
}

/// Creates the backoff delay sequence for provider retries.
///
/// Delays are `backoff_base^attempt` seconds: with the default base of 2 the
/// sequence is 2s, 4s, 8s, ... capped so a misconfigured base cannot stall a
/// scan indefinitely.
pub fn retry_strategy(backoff_base_secs: u64) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(backoff_base_secs.max(1))
        .factor(1000)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
}
