//! VirusTotal v3 URL-analysis client.
//!
//! Lookups address `/urls/{id}` where `id` is the unpadded URL-safe base64 of
//! the URL itself. A 404 means VirusTotal has never seen the URL; it is then
//! submitted for analysis and this check reports `Unknown`; a later scan
//! picks up the finished analysis.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use log::debug;
use serde::Deserialize;

use crate::config::{
    HTTP_STATUS_SERVICE_UNAVAILABLE, HTTP_STATUS_TOO_MANY_REQUESTS, VIRUSTOTAL_ENDPOINT,
};
use crate::error_handling::ProviderError;
use crate::reputation::provider::{ProviderOutcome, ProviderVerdict, UrlProvider};

#[derive(Debug, Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Debug, Deserialize)]
struct VtData {
    attributes: VtAttributes,
}

#[derive(Debug, Deserialize)]
struct VtAttributes {
    last_analysis_stats: VtStats,
}

#[derive(Debug, Deserialize)]
struct VtStats {
    #[serde(default)]
    malicious: u64,
    #[serde(default)]
    suspicious: u64,
}

/// VirusTotal client. Without an API key every check reports `Unknown`
/// immediately.
pub struct VirusTotal {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl VirusTotal {
    /// Creates a client against the production endpoint.
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_endpoint(client, api_key, VIRUSTOTAL_ENDPOINT)
    }

    /// Creates a client against a custom endpoint base (mock servers in
    /// tests).
    pub fn with_endpoint(
        client: reqwest::Client,
        api_key: Option<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        VirusTotal {
            client,
            api_key,
            endpoint: endpoint.into(),
        }
    }

    /// Creates a client keyed from the `VT_API_KEY` environment variable.
    pub fn from_env(client: reqwest::Client) -> Self {
        let api_key = std::env::var(crate::config::VT_API_KEY_ENV).ok();
        Self::new(client, api_key)
    }

    /// Submits an unseen URL for analysis. Best effort; failures only log.
    async fn submit(&self, url: &str, api_key: &str) {
        let result = self
            .client
            .post(&self.endpoint)
            .header("x-apikey", api_key)
            .form(&[("url", url)])
            .send()
            .await;
        if let Err(e) = result {
            debug!("VirusTotal submission failed: {e}");
        }
    }
}

#[async_trait]
impl UrlProvider for VirusTotal {
    fn id(&self) -> &'static str {
        "virustotal"
    }

    async fn check_once(&self, url: &str) -> Result<ProviderVerdict, ProviderError> {
        let Some(api_key) = self.api_key.clone() else {
            return Ok(ProviderVerdict {
                provider_id: self.id(),
                outcome: ProviderOutcome::Unknown,
                raw_detail: None,
            });
        };

        let url_id = URL_SAFE_NO_PAD.encode(url.as_bytes());
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint, url_id))
            .header("x-apikey", &api_key)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 404 {
            self.submit(url, &api_key).await;
            return Ok(ProviderVerdict {
                provider_id: self.id(),
                outcome: ProviderOutcome::Unknown,
                raw_detail: Some("submitted for analysis".to_string()),
            });
        }
        if status == HTTP_STATUS_TOO_MANY_REQUESTS || status == HTTP_STATUS_SERVICE_UNAVAILABLE {
            return Err(ProviderError::Throttled(status));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status(status));
        }

        let body: VtResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let stats = body.data.attributes.last_analysis_stats;

        if stats.malicious > 0 || stats.suspicious > 0 {
            Ok(ProviderVerdict {
                provider_id: self.id(),
                outcome: ProviderOutcome::Unsafe,
                raw_detail: Some(format!(
                    "{} malicious, {} suspicious",
                    stats.malicious, stats.suspicious
                )),
            })
        } else {
            Ok(ProviderVerdict {
                provider_id: self.id(),
                outcome: ProviderOutcome::Safe,
                raw_detail: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_id_is_unpadded_urlsafe_base64() {
        let id = URL_SAFE_NO_PAD.encode("https://example.com/".as_bytes());
        assert!(!id.contains('='));
        assert!(!id.contains('+'));
        assert!(!id.contains('/'));
    }

    #[tokio::test]
    async fn test_missing_key_is_immediate_unknown() {
        let provider = VirusTotal::new(reqwest::Client::new(), None);
        let verdict = provider.check_once("https://example.com/").await.unwrap();
        assert_eq!(verdict.outcome, ProviderOutcome::Unknown);
    }
}
