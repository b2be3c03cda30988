//! Reputation aggregation: fan out to independent providers, reduce their
//! outcomes to one verdict.
//!
//! Providers run concurrently; a slow or retry-heavy provider delays only the
//! final consensus of its own scan, never the other providers' queries. A
//! first-pass indeterminate result is re-checked exactly once after a fixed
//! delay to absorb transient provider unavailability.

mod provider;
mod safe_browsing;
mod virustotal;

pub use provider::{ProviderOutcome, ProviderVerdict, RetryPolicy, UrlProvider};
pub use safe_browsing::SafeBrowsing;
pub use virustotal::VirusTotal;

use std::time::Duration;

use futures::future::join_all;
use log::{debug, info};

use crate::validate::NormalizedUrl;
use crate::verdict::{mask_url, Verdict, VerdictStatus};

/// Reduces provider outcomes to a final status.
///
/// - any `Unsafe` → `Dangerous`
/// - at least one outcome, all of them `Safe` → `Safe`
/// - anything else (no outcomes, any `Unknown`) → `Indeterminate`
///
/// A lone `Unknown` therefore poisons full-safe consensus: `[Safe, Unknown]`
/// is indeterminate, not safe.
pub fn consensus(outcomes: &[ProviderOutcome]) -> VerdictStatus {
    if outcomes.contains(&ProviderOutcome::Unsafe) {
        VerdictStatus::Dangerous
    } else if !outcomes.is_empty() && outcomes.iter().all(|o| *o == ProviderOutcome::Safe) {
        VerdictStatus::Safe
    } else {
        VerdictStatus::Indeterminate
    }
}

/// Queries all configured providers and applies the consensus policy.
pub struct ReputationAggregator {
    providers: Vec<Box<dyn UrlProvider>>,
    allow_domains: Vec<String>,
    retry: RetryPolicy,
    recheck_delay: Duration,
}

impl ReputationAggregator {
    /// Creates an aggregator over the given providers.
    pub fn new(
        providers: Vec<Box<dyn UrlProvider>>,
        allow_domains: Vec<String>,
        retry: RetryPolicy,
        recheck_delay: Duration,
    ) -> Self {
        ReputationAggregator {
            providers,
            allow_domains,
            retry,
            recheck_delay,
        }
    }

    /// Whether the host is on the allow-list (exact match or subdomain).
    pub fn is_allow_listed(&self, host: &str) -> bool {
        self.allow_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{d}")))
    }

    async fn fan_out(&self, url: &str) -> Vec<ProviderVerdict> {
        join_all(
            self.providers
                .iter()
                .map(|p| provider::query_with_retry(p.as_ref(), url, &self.retry)),
        )
        .await
    }

    /// Produces the final verdict for a validated URL.
    ///
    /// Allow-listed hosts short-circuit to `Safe` without contacting any
    /// provider; with zero configured providers the fan-out is skipped and
    /// the verdict is `Indeterminate`.
    pub async fn aggregate(&self, url: &NormalizedUrl) -> Verdict {
        if self.is_allow_listed(url.host()) {
            debug!("{} is allow-listed", mask_url(url.canonical()));
            return Verdict::new(VerdictStatus::Safe, url.canonical());
        }
        if self.providers.is_empty() {
            return Verdict::new(VerdictStatus::Indeterminate, url.canonical());
        }

        let verdicts = self.fan_out(url.canonical()).await;
        let outcomes: Vec<ProviderOutcome> = verdicts.iter().map(|v| v.outcome).collect();
        let mut status = consensus(&outcomes);

        // One delayed re-check absorbs transient provider unavailability
        // without looping indefinitely.
        if status == VerdictStatus::Indeterminate {
            info!(
                "Indeterminate verdict for {}, re-checking in {:?}",
                mask_url(url.canonical()),
                self.recheck_delay
            );
            tokio::time::sleep(self.recheck_delay).await;
            let verdicts = self.fan_out(url.canonical()).await;
            let outcomes: Vec<ProviderOutcome> = verdicts.iter().map(|v| v.outcome).collect();
            status = consensus(&outcomes);
        }

        Verdict::new(status, url.canonical())
    }
}
