//! The scan scheduler: admission control plus the per-URL pipeline sequence.
//!
//! `Scanner::scan` is the single operation the chat layer calls. It is safe
//! to call from many tasks at once; a counting semaphore bounds how many
//! scans (and therefore how many outbound provider queries) are in flight,
//! suspending excess callers until a slot frees. That backpressure is the
//! pipeline's defense against provider rate limits, not a performance
//! optimization.

use std::sync::Arc;

use log::{error, info};
use tokio::sync::Semaphore;

use crate::audit::AuditSink;
use crate::error_handling::RejectReason;
use crate::expand::RedirectResolver;
use crate::reputation::ReputationAggregator;
use crate::ssrf::SsrfGuard;
use crate::validate::{validate, NormalizedUrl};
use crate::verdict::{mask_url, Verdict};

/// Result of one `scan` call.
///
/// A rejected URL is *not analyzed*, a state deliberately distinct from any
/// verdict: it was never sent to a provider and never audited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The URL failed validation or the SSRF guard and was not analyzed.
    NotAnalyzed(RejectReason),
    /// The URL went through the full pipeline and received a verdict.
    Analyzed(Verdict),
}

impl ScanOutcome {
    /// The verdict, when the URL was analyzed.
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            ScanOutcome::Analyzed(verdict) => Some(verdict),
            ScanOutcome::NotAnalyzed(_) => None,
        }
    }
}

/// Orchestrates one scan end to end:
/// validate → SSRF guard → short-link expansion → reputation → audit.
pub struct Scanner {
    pipeline: Arc<ScanPipeline>,
}

/// The shared pipeline state a scan task runs against.
struct ScanPipeline {
    semaphore: Arc<Semaphore>,
    guard: SsrfGuard,
    resolver: RedirectResolver,
    aggregator: ReputationAggregator,
    audit: Arc<dyn AuditSink>,
}

impl Scanner {
    /// Assembles a scanner from its injected components.
    ///
    /// Production wiring (HTTP clients, DNS resolver, SQLite audit log,
    /// env-keyed providers) lives in [`crate::run_scan`]; tests pass fakes.
    pub fn new(
        max_concurrency: usize,
        guard: SsrfGuard,
        resolver: RedirectResolver,
        aggregator: ReputationAggregator,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Scanner {
            pipeline: Arc::new(ScanPipeline {
                semaphore: crate::initialization::init_semaphore(max_concurrency.max(1)),
                guard,
                resolver,
                aggregator,
                audit,
            }),
        }
    }

    /// Scans one raw URL string.
    ///
    /// Never returns an error and never panics: every failure mode maps to
    /// either `NotAnalyzed` or a degraded verdict, so a malicious URL cannot
    /// take down the caller's message loop. The audit write is dispatched on
    /// a detached task; the result does not wait on storage.
    ///
    /// The scan itself runs on its own task. A caller that loses interest
    /// and drops this future abandons the result, not the scan: the pipeline
    /// still runs to completion and the audit record is still written.
    pub async fn scan(&self, raw_url: &str) -> ScanOutcome {
        let pipeline = Arc::clone(&self.pipeline);
        let raw = raw_url.to_string();
        match tokio::spawn(async move { pipeline.run(&raw).await }).await {
            Ok(outcome) => outcome,
            // The pipeline never panics; this arm is reachable only during
            // runtime shutdown.
            Err(e) => {
                error!("Scan task aborted: {e}");
                ScanOutcome::NotAnalyzed(RejectReason::Aborted)
            }
        }
    }
}

impl ScanPipeline {
    async fn run(&self, raw_url: &str) -> ScanOutcome {
        // The semaphore is owned by the pipeline and never closed.
        let _permit = self.semaphore.acquire().await.ok();

        let normalized = match validate(raw_url) {
            Ok(normalized) => normalized,
            Err(reason) => {
                info!("Rejected URL ({reason})");
                return ScanOutcome::NotAnalyzed(reason);
            }
        };

        if self.guard.is_blocked(normalized.host()).await {
            info!("Blocked host {}", mask_url(normalized.canonical()));
            return ScanOutcome::NotAnalyzed(RejectReason::BlockedHost(
                normalized.host().to_string(),
            ));
        }

        let target = match self.expand_target(normalized).await {
            Ok(target) => target,
            Err(reason) => return ScanOutcome::NotAnalyzed(reason),
        };

        let verdict = self.aggregator.aggregate(&target).await;
        self.dispatch_audit(&target, &verdict);

        ScanOutcome::Analyzed(verdict)
    }

    /// Runs short-link expansion and re-validates the expanded URL.
    async fn expand_target(&self, normalized: NormalizedUrl) -> Result<NormalizedUrl, RejectReason> {
        let expansion = self.resolver.expand(&normalized, &self.guard).await;
        if let Some(host) = expansion.blocked_host {
            info!(
                "Redirect chain from {} hit blocked host",
                mask_url(normalized.canonical())
            );
            return Err(RejectReason::BlockedHost(host));
        }
        if expansion.final_url == normalized.canonical() {
            return Ok(normalized);
        }
        // The expanded URL came off the network; it gets the same scrutiny
        // as caller input.
        validate(&expansion.final_url)
    }

    fn dispatch_audit(&self, target: &NormalizedUrl, verdict: &Verdict) {
        let sink = Arc::clone(&self.audit);
        let url = target.canonical().to_string();
        let status = verdict.status();
        tokio::spawn(async move {
            sink.record(&url, status).await;
        });
    }
}
