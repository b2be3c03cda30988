//! link_verdict library: URL threat-analysis pipeline
//!
//! Given a raw URL string, this library decides whether it is SAFE,
//! DANGEROUS, or INDETERMINATE by querying multiple independent reputation
//! providers, while defending against encoding tricks, redirect abuse, and
//! server-side request forgery. Every analyzed URL is recorded in an
//! encrypted append-only audit log.
//!
//! # Example
//!
//! ```no_run
//! use link_verdict::{Config, run_scan};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     file: std::path::PathBuf::from("urls.txt"),
//!     max_concurrency: 8,
//!     ..Default::default()
//! };
//!
//! let report = run_scan(config).await?;
//! println!("Scanned {} URLs: {} safe, {} dangerous, {} indeterminate, {} rejected",
//!          report.total_urls, report.safe, report.dangerous,
//!          report.indeterminate, report.rejected);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

mod audit;
pub mod config;
mod error_handling;
mod expand;
pub mod initialization;
mod reputation;
mod scheduler;
mod ssrf;
mod validate;
mod verdict;

// Re-export public API
pub use audit::{AuditSink, MemoryAuditLog, SqliteAuditLog};
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::RejectReason;
pub use expand::{Expansion, ExpansionCache, RedirectResolver};
pub use reputation::{
    consensus, ProviderOutcome, ProviderVerdict, ReputationAggregator, RetryPolicy, SafeBrowsing,
    UrlProvider, VirusTotal,
};
pub use run::{build_scanner, run_scan, ScanReport};
pub use scheduler::{ScanOutcome, Scanner};
pub use ssrf::{is_private_ip, SsrfGuard};
pub use validate::{validate, NormalizedUrl};
pub use verdict::{defang, mask_url, Verdict, VerdictStatus};

// Internal run module (contains the batch scanning logic)
mod run {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{info, warn};
    use tokio::io::{AsyncBufReadExt, BufReader};

    use crate::audit::SqliteAuditLog;
    use crate::config::Config;
    use crate::expand::{ExpansionCache, RedirectResolver};
    use crate::initialization::{init_client, init_redirect_client, init_resolver};
    use crate::reputation::{
        ReputationAggregator, RetryPolicy, SafeBrowsing, UrlProvider, VirusTotal,
    };
    use crate::scheduler::{ScanOutcome, Scanner};
    use crate::ssrf::SsrfGuard;
    use crate::verdict::VerdictStatus;

    /// Results of a batch scanning run.
    ///
    /// Contains summary statistics about the completed scan.
    #[derive(Debug, Clone)]
    pub struct ScanReport {
        /// Total number of URLs fed into the pipeline
        pub total_urls: usize,
        /// URLs with a SAFE verdict
        pub safe: usize,
        /// URLs with a DANGEROUS verdict
        pub dangerous: usize,
        /// URLs with an INDETERMINATE verdict
        pub indeterminate: usize,
        /// URLs rejected before analysis (not analyzed)
        pub rejected: usize,
        /// Path to the SQLite audit database
        pub db_path: PathBuf,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Builds a production [`Scanner`] from the configuration.
    ///
    /// Wires the HTTP clients, DNS resolver, redirect cache, env-keyed
    /// providers (`GSB_API_KEY`, `VT_API_KEY`) and the encrypted SQLite
    /// audit log. Library users embedding the pipeline call this once and
    /// then invoke [`Scanner::scan`] per URL.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client, resolver, or audit-log
    /// initialization fails.
    pub async fn build_scanner(config: &Config) -> Result<Scanner> {
        let client = init_client(config).context("Failed to initialize HTTP client")?;
        let redirect_client =
            init_redirect_client(config).context("Failed to initialize redirect client")?;
        let resolver = init_resolver().context("Failed to initialize DNS resolver")?;

        let guard = SsrfGuard::new(resolver, !config.no_ssrf_block);
        let expander = RedirectResolver::new(
            redirect_client,
            ExpansionCache::new(config.cache_ttl()),
            config.shortlink_domains(),
            config.max_redirects,
        );

        let providers: Vec<Box<dyn UrlProvider>> = vec![
            Box::new(SafeBrowsing::from_env(client.clone())),
            Box::new(VirusTotal::from_env(client)),
        ];
        let aggregator = ReputationAggregator::new(
            providers,
            config.allow_domains.clone(),
            RetryPolicy {
                max_attempts: config.max_retries,
                backoff_base_secs: config.backoff_base_secs,
            },
            config.recheck_delay(),
        );

        let audit = SqliteAuditLog::open(&config.db_path, &config.key_file)
            .await
            .context("Failed to initialize audit log")?;

        Ok(Scanner::new(
            config.max_concurrency,
            guard,
            expander,
            aggregator,
            Arc::new(audit),
        ))
    }

    /// Runs a batch scan with the provided configuration.
    ///
    /// Reads URLs from the input file (or stdin when the path is `-`), one
    /// per line; blank lines and lines starting with `#` are skipped. URLs
    /// are scanned concurrently, bounded by the pipeline's semaphore.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The input file cannot be opened
    /// - HTTP client, resolver, or audit-log initialization fails
    pub async fn run_scan(config: Config) -> Result<ScanReport> {
        let scanner = Arc::new(build_scanner(&config).await?);

        let is_stdin = config.file.as_os_str() == "-";
        let mut stdin_lines = if is_stdin {
            info!("Reading URLs from stdin");
            Some(BufReader::new(tokio::io::stdin()).lines())
        } else {
            None
        };
        let mut file_lines = if !is_stdin {
            let file = tokio::fs::File::open(&config.file)
                .await
                .context("Failed to open input file")?;
            Some(BufReader::new(file).lines())
        } else {
            None
        };

        let safe = Arc::new(AtomicUsize::new(0));
        let dangerous = Arc::new(AtomicUsize::new(0));
        let indeterminate = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let total = Arc::new(AtomicUsize::new(0));

        let start_time = std::time::Instant::now();
        let mut tasks = FuturesUnordered::new();

        loop {
            let line_result = if is_stdin {
                stdin_lines
                    .as_mut()
                    .expect("stdin_lines should be Some when is_stdin is true")
                    .next_line()
                    .await
            } else {
                file_lines
                    .as_mut()
                    .expect("file_lines should be Some when is_stdin is false")
                    .next_line()
                    .await
            };
            let line = match line_result {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read line from input: {e}");
                    continue;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            total.fetch_add(1, Ordering::SeqCst);
            let raw_url = trimmed.to_string();
            let scanner = Arc::clone(&scanner);
            let safe = Arc::clone(&safe);
            let dangerous = Arc::clone(&dangerous);
            let indeterminate = Arc::clone(&indeterminate);
            let rejected = Arc::clone(&rejected);

            tasks.push(tokio::spawn(async move {
                match scanner.scan(&raw_url).await {
                    ScanOutcome::Analyzed(verdict) => {
                        match verdict.status() {
                            VerdictStatus::Safe => safe.fetch_add(1, Ordering::SeqCst),
                            VerdictStatus::Dangerous => dangerous.fetch_add(1, Ordering::SeqCst),
                            VerdictStatus::Indeterminate => {
                                indeterminate.fetch_add(1, Ordering::SeqCst)
                            }
                        };
                        info!("{} {}", verdict.status(), verdict.display_url());
                    }
                    ScanOutcome::NotAnalyzed(reason) => {
                        rejected.fetch_add(1, Ordering::SeqCst);
                        info!("NOT ANALYZED ({reason})");
                    }
                }
            }));
        }

        while let Some(task_result) = tasks.next().await {
            if let Err(join_error) = task_result {
                warn!("Scan task panicked: {join_error:?}");
            }
        }

        Ok(ScanReport {
            total_urls: total.load(Ordering::SeqCst),
            safe: safe.load(Ordering::SeqCst),
            dangerous: dangerous.load(Ordering::SeqCst),
            indeterminate: indeterminate.load(Ordering::SeqCst),
            rejected: rejected.load(Ordering::SeqCst),
            db_path: config.db_path.clone(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
