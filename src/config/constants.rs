//! Configuration constants used as defaults across the pipeline.

/// Maximum URL length (2048 characters) to prevent DoS attacks via extremely
/// long URLs. This matches common browser and server limits.
pub const MAX_URL_LENGTH: usize = 2048;

/// Default number of concurrently executing scans (semaphore permits).
/// This is the sole admission-control point against provider rate limits.
pub const SEMAPHORE_LIMIT: usize = 5;

/// Maximum number of redirect hops followed during short-link expansion.
pub const MAX_REDIRECT_HOPS: usize = 3;

/// Maximum provider query attempts (initial attempt included).
pub const RETRY_MAX_ATTEMPTS: usize = 3;

/// Base of the exponential backoff between retries, in seconds.
/// The delay before attempt `n` is `base^n` seconds.
pub const RETRY_BACKOFF_BASE_SECS: u64 = 2;

/// Maximum delay between retries in seconds.
pub const RETRY_MAX_DELAY_SECS: u64 = 20;

/// Time-to-live for redirect-expansion cache entries, in seconds.
pub const REDIRECT_CACHE_TTL_SECS: u64 = 3600;

/// Delay before the single re-check of a first-pass indeterminate verdict,
/// in seconds.
pub const RECHECK_DELAY_SECS: u64 = 5;

/// Per-request HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// DNS query timeout in seconds.
pub const DNS_TIMEOUT_SECS: u64 = 10;

/// HTTP status codes that trigger a retry with backoff.
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
/// See [`HTTP_STATUS_TOO_MANY_REQUESTS`].
pub const HTTP_STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// Default SQLite database path for the audit log.
pub const DB_PATH: &str = "./link_verdict.db";

/// Default path of the persisted audit encryption key file.
pub const KEY_FILE: &str = "./audit.key";

/// Environment variable holding the base64-encoded 32-byte audit key.
/// When unset, a key is generated once and persisted to the key file.
pub const AUDIT_KEY_ENV: &str = "LINK_VERDICT_AUDIT_KEY";

/// Environment variable holding the Google Safe Browsing API key.
pub const GSB_API_KEY_ENV: &str = "GSB_API_KEY";

/// Environment variable holding the VirusTotal API key.
pub const VT_API_KEY_ENV: &str = "VT_API_KEY";

/// Google Safe Browsing v4 lookup endpoint.
pub const SAFE_BROWSING_ENDPOINT: &str =
    "https://safebrowsing.googleapis.com/v4/threatMatches:find";

/// VirusTotal v3 URL-analysis endpoint (URL id is appended for lookups).
pub const VIRUSTOTAL_ENDPOINT: &str = "https://www.virustotal.com/api/v3/urls";

/// Short-link hosts that are expanded before analysis. Subdomains match too.
pub const DEFAULT_SHORTLINK_DOMAINS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "rb.gy",
    "cutt.ly",
    "tiny.cc",
];

/// Default User-Agent string for HTTP requests.
pub const DEFAULT_USER_AGENT: &str = concat!("link_verdict/", env!("CARGO_PKG_VERSION"));
