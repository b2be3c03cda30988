//! The provider seam: one trait per external reputation source, plus the
//! bounded retry loop shared by all of them.

use async_trait::async_trait;
use log::{debug, warn};

use crate::error_handling::{retry_strategy, ProviderError};

/// Outcome of a single provider for a single URL.
///
/// `Unknown` covers timeouts, errors and missing credentials; it is never a
/// positive signal in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// The provider found no threat.
    Safe,
    /// The provider flagged the URL.
    Unsafe,
    /// The provider could not produce a definitive answer.
    Unknown,
}

/// One provider's answer, as consumed by the aggregator.
#[derive(Debug, Clone)]
pub struct ProviderVerdict {
    /// Stable identifier of the provider that produced this verdict.
    pub provider_id: &'static str,
    /// The three-valued outcome.
    pub outcome: ProviderOutcome,
    /// Provider-specific detail (match list, analysis stats), for logs only.
    pub raw_detail: Option<String>,
}

/// Retry bounds for provider queries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts, initial attempt included.
    pub max_attempts: usize,
    /// Backoff base in seconds; delay before attempt `n` is `base^n` seconds.
    pub backoff_base_secs: u64,
}

/// An external reputation source.
///
/// Implementations own their wire format entirely; the rest of the pipeline
/// sees only [`ProviderVerdict`]s. `check_once` performs exactly one attempt;
/// retrying is the caller's job via [`query_with_retry`].
#[async_trait]
pub trait UrlProvider: Send + Sync {
    /// Stable identifier used in logs and verdict records.
    fn id(&self) -> &'static str;

    /// Queries the provider once for the given canonical URL.
    ///
    /// A missing API key is not an error: implementations return an
    /// `Unknown` verdict immediately.
    async fn check_once(&self, url: &str) -> Result<ProviderVerdict, ProviderError>;
}

/// Queries a provider with the bounded retry loop.
///
/// Only throttling responses (429/503) are retried, waiting
/// `backoff_base^attempt` seconds between attempts. Every other error, and
/// exhaustion of the attempt budget, degrades to `Unknown`; provider
/// failures never escape this function.
pub async fn query_with_retry(
    provider: &dyn UrlProvider,
    url: &str,
    policy: &RetryPolicy,
) -> ProviderVerdict {
    let mut delays = retry_strategy(policy.backoff_base_secs);
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match provider.check_once(url).await {
            Ok(verdict) => return verdict,
            Err(e) if e.is_retriable() && attempt < attempts => {
                // ExponentialBackoff is an infinite iterator; unwrap_or is
                // for the type, not an expected path.
                let delay = delays.next().unwrap_or_default();
                debug!(
                    "{} throttled (attempt {attempt}/{attempts}), backing off {delay:?}: {e}",
                    provider.id()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!("{} check failed, degrading to unknown: {e}", provider.id());
                return ProviderVerdict {
                    provider_id: provider.id(),
                    outcome: ProviderOutcome::Unknown,
                    raw_detail: None,
                };
            }
        }
    }
    ProviderVerdict {
        provider_id: provider.id(),
        outcome: ProviderOutcome::Unknown,
        raw_detail: None,
    }
}
