//! Short-link expansion: follows a bounded redirect chain for known
//! shortener domains, re-checking the SSRF guard at every hop.
//!
//! Expansion never fails. Transport errors, unparsable `Location` headers and
//! exhausted hop budgets all degrade to "stop at the last URL we reached". An
//! SSRF-blocked hop is the one exception that is reported distinctly, because
//! the scheduler must refuse to analyze such a chain rather than analyze its
//! truncation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use reqwest::StatusCode;
use tokio::sync::RwLock;
use url::Url;

use crate::ssrf::SsrfGuard;
use crate::validate::NormalizedUrl;
use crate::verdict::mask_url;

/// One resolved short link.
///
/// Entries are replaced wholesale on refresh, never mutated.
struct CacheEntry {
    resolved_url: String,
    expires_at: Instant,
}

/// Time-bounded cache of redirect expansions, keyed by the original short
/// URL. Stale entries are evicted lazily on lookup.
pub struct ExpansionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ExpansionCache {
    /// Creates an empty cache with the given entry lifetime.
    pub fn new(ttl: Duration) -> Self {
        ExpansionCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached resolution for `short_url` if it has not expired.
    pub async fn get(&self, short_url: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(short_url) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.resolved_url.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it so the map does not accumulate dead entries.
        self.entries.write().await.remove(short_url);
        None
    }

    /// Stores (or replaces) the resolution for `short_url`.
    pub async fn insert(&self, short_url: &str, resolved_url: &str) {
        let entry = CacheEntry {
            resolved_url: resolved_url.to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(short_url.to_string(), entry);
    }
}

/// Outcome of an expansion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// The last URL reached; equals the input when no expansion applied.
    pub final_url: String,
    /// Set when a redirect hop targeted a blocked host; the chain stopped
    /// before contacting it.
    pub blocked_host: Option<String>,
}

impl Expansion {
    fn passthrough(url: &str) -> Self {
        Expansion {
            final_url: url.to_string(),
            blocked_host: None,
        }
    }
}

/// Expands short links by walking their redirect chain manually.
pub struct RedirectResolver {
    client: reqwest::Client,
    cache: ExpansionCache,
    shortlink_domains: Vec<String>,
    max_redirects: usize,
}

impl RedirectResolver {
    /// Creates a resolver.
    ///
    /// `client` must have automatic redirects disabled; the chain is walked
    /// manually so each hop can be SSRF-checked before it is contacted.
    pub fn new(
        client: reqwest::Client,
        cache: ExpansionCache,
        shortlink_domains: Vec<String>,
        max_redirects: usize,
    ) -> Self {
        RedirectResolver {
            client,
            cache,
            shortlink_domains,
            max_redirects,
        }
    }

    /// Whether the host belongs to a configured short-link domain
    /// (exact match or subdomain).
    pub fn is_shortlink(&self, host: &str) -> bool {
        self.shortlink_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{d}")))
    }

    /// Expands a URL. Non-shortlink hosts pass through unchanged; cached
    /// resolutions are returned without any network call.
    pub async fn expand(&self, url: &NormalizedUrl, guard: &SsrfGuard) -> Expansion {
        if !self.is_shortlink(url.host()) {
            return Expansion::passthrough(url.canonical());
        }
        if let Some(resolved) = self.cache.get(url.canonical()).await {
            debug!("Redirect cache hit for {}", mask_url(url.canonical()));
            return Expansion {
                final_url: resolved,
                blocked_host: None,
            };
        }

        // `current` is the last resolved URL (what we probe next); `reached`
        // is the last URL that actually answered, which is where a transport
        // failure falls back to.
        let mut current = url.canonical().to_string();
        let mut reached: Option<String> = None;
        let mut blocked_host = None;

        for _ in 0..self.max_redirects {
            let response = match self.probe(&current).await {
                Some(response) => response,
                None => {
                    if let Some(previous) = reached {
                        current = previous;
                    }
                    break;
                }
            };
            reached = Some(current.clone());
            if !response.status().is_redirection() {
                break;
            }
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok());
            let Some(location) = location else { break };

            // Location may be absolute or relative to the current URL.
            let next = match Url::parse(location)
                .or_else(|_| Url::parse(&current).and_then(|base| base.join(location)))
            {
                Ok(next) => next,
                Err(_) => break,
            };
            let Some(next_host) = next.host_str() else { break };

            if guard.is_blocked(next_host).await {
                debug!(
                    "Redirect hop to {} blocked, stopping at {}",
                    next_host,
                    mask_url(&current)
                );
                blocked_host = Some(next_host.to_string());
                break;
            }
            current = next.to_string();
        }

        // A blocked chain is not memoized: a later scan must reject it again
        // rather than silently analyze the truncated URL.
        if blocked_host.is_none() {
            self.cache.insert(url.canonical(), &current).await;
        }
        Expansion {
            final_url: current,
            blocked_host,
        }
    }

    /// Issues a HEAD request, falling back to GET when the server rejects the
    /// method. Transport errors end the chain (`None`).
    async fn probe(&self, url: &str) -> Option<reqwest::Response> {
        match self.client.head(url).send().await {
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                self.client.get(url).send().await.ok()
            }
            Ok(response) => Some(response),
            Err(e) => {
                debug!("Expansion stopped at {}: {e}", mask_url(url));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_returns_fresh_entry() {
        let cache = ExpansionCache::new(Duration::from_secs(60));
        cache.insert("https://sho.rt/a", "https://example.com/long").await;
        assert_eq!(
            cache.get("https://sho.rt/a").await,
            Some("https://example.com/long".to_string())
        );
    }

    #[tokio::test]
    async fn test_cache_expires_entries() {
        let cache = ExpansionCache::new(Duration::from_millis(10));
        cache.insert("https://sho.rt/a", "https://example.com/long").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("https://sho.rt/a").await, None);
    }

    #[tokio::test]
    async fn test_cache_replaces_wholesale() {
        let cache = ExpansionCache::new(Duration::from_secs(60));
        cache.insert("https://sho.rt/a", "https://old.example.com").await;
        cache.insert("https://sho.rt/a", "https://new.example.com").await;
        assert_eq!(
            cache.get("https://sho.rt/a").await,
            Some("https://new.example.com".to_string())
        );
    }

    #[test]
    fn test_shortlink_matching() {
        let resolver = RedirectResolver::new(
            reqwest::Client::new(),
            ExpansionCache::new(Duration::from_secs(60)),
            vec!["bit.ly".to_string(), "tinyurl.com".to_string()],
            3,
        );
        assert!(resolver.is_shortlink("bit.ly"));
        assert!(resolver.is_shortlink("www.bit.ly"));
        assert!(!resolver.is_shortlink("notbit.ly.example.com"));
        assert!(!resolver.is_shortlink("example.com"));
    }
}
