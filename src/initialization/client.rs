//! HTTP client initialization.
//!
//! Two clients are built: a default client for provider queries, and a
//! client with redirects disabled for the short-link expander, which must
//! walk the redirect chain manually so every hop can be SSRF-checked before
//! it is contacted.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, DEFAULT_USER_AGENT};

/// Initializes the HTTP client used for provider queries.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}

/// Initializes the HTTP client used for redirect resolution.
///
/// Redirects are disabled so the expander can track the chain itself; a
/// client that follows redirects automatically would skip the per-hop SSRF
/// checks.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_redirect_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}
