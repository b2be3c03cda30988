//! Google Safe Browsing v4 client (`threatMatches:find`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::{
    HTTP_STATUS_SERVICE_UNAVAILABLE, HTTP_STATUS_TOO_MANY_REQUESTS, SAFE_BROWSING_ENDPOINT,
};
use crate::error_handling::ProviderError;
use crate::reputation::provider::{ProviderOutcome, ProviderVerdict, UrlProvider};

#[derive(Debug, Deserialize)]
struct ThreatMatchesResponse {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

/// Safe Browsing lookup client. Without an API key every check reports
/// `Unknown` immediately.
pub struct SafeBrowsing {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl SafeBrowsing {
    /// Creates a client against the production endpoint.
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_endpoint(client, api_key, SAFE_BROWSING_ENDPOINT)
    }

    /// Creates a client against a custom endpoint (mock servers in tests).
    pub fn with_endpoint(
        client: reqwest::Client,
        api_key: Option<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        SafeBrowsing {
            client,
            api_key,
            endpoint: endpoint.into(),
        }
    }

    /// Creates a client keyed from the `GSB_API_KEY` environment variable.
    pub fn from_env(client: reqwest::Client) -> Self {
        let api_key = std::env::var(crate::config::GSB_API_KEY_ENV).ok();
        Self::new(client, api_key)
    }

    fn unknown(&self) -> ProviderVerdict {
        ProviderVerdict {
            provider_id: self.id(),
            outcome: ProviderOutcome::Unknown,
            raw_detail: None,
        }
    }
}

#[async_trait]
impl UrlProvider for SafeBrowsing {
    fn id(&self) -> &'static str {
        "safe_browsing"
    }

    async fn check_once(&self, url: &str) -> Result<ProviderVerdict, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Ok(self.unknown());
        };

        let payload = json!({
            "client": {"clientId": "link_verdict", "clientVersion": env!("CARGO_PKG_VERSION")},
            "threatInfo": {
                "threatTypes": [
                    "MALWARE", "SOCIAL_ENGINEERING",
                    "POTENTIALLY_HARMFUL_APPLICATION", "UNWANTED_SOFTWARE"
                ],
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{"url": url}]
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == HTTP_STATUS_TOO_MANY_REQUESTS || status == HTTP_STATUS_SERVICE_UNAVAILABLE {
            return Err(ProviderError::Throttled(status));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status(status));
        }

        let body: ThreatMatchesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if body.matches.is_empty() {
            Ok(ProviderVerdict {
                provider_id: self.id(),
                outcome: ProviderOutcome::Safe,
                raw_detail: None,
            })
        } else {
            Ok(ProviderVerdict {
                provider_id: self.id(),
                outcome: ProviderOutcome::Unsafe,
                raw_detail: serde_json::to_string(&body.matches).ok(),
            })
        }
    }
}
