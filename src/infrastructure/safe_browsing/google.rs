//! Google Safe Browsing v4 `threatMatches:find` client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::domain::ports::{SafeBrowsingError, SafeBrowsingService};

pub const DEFAULT_ENDPOINT: &str = "https://safebrowsing.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

const THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

/// Connection settings for the lookup API.
#[derive(Clone)]
pub struct GoogleSafeBrowsingSettings {
    pub api_key: String,
    /// Base URL, without the `/v4/...` path.
    pub endpoint: String,
    pub client_id: String,
    pub client_version: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GoogleSafeBrowsingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSafeBrowsingSettings")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_version", &self.client_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindThreatMatchesRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'a [&'a str],
    platform_types: [&'a str; 1],
    threat_entry_types: [&'a str; 1],
    threat_entries: Vec<ThreatEntry<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ThreatEntry<'a> {
    url: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Default, Deserialize)]
struct FindThreatMatchesResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
struct ThreatMatch {
    threat: ThreatEntry<'static>,
}

/// Client for the Safe Browsing Lookup API.
#[derive(Debug, Clone)]
pub struct GoogleSafeBrowsing {
    client: Client,
    settings: GoogleSafeBrowsingSettings,
}

impl GoogleSafeBrowsing {
    pub fn new(settings: GoogleSafeBrowsingSettings) -> Result<Self, SafeBrowsingError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SafeBrowsingError::Transport(e.to_string()))?;

        Ok(Self { client, settings })
    }

    fn lookup_url(&self) -> String {
        format!(
            "{}/v4/threatMatches:find",
            self.settings.endpoint.trim_end_matches('/')
        )
    }

    fn request_body<'a>(&'a self, urls: &'a [String]) -> FindThreatMatchesRequest<'a> {
        FindThreatMatchesRequest {
            client: ClientInfo {
                client_id: &self.settings.client_id,
                client_version: &self.settings.client_version,
            },
            threat_info: ThreatInfo {
                threat_types: &THREAT_TYPES,
                platform_types: ["ANY_PLATFORM"],
                threat_entry_types: ["URL"],
                threat_entries: urls
                    .iter()
                    .map(|url| ThreatEntry { url: url.into() })
                    .collect(),
            },
        }
    }
}

/// Distinct threat URLs, in the order they were first reported.
fn threat_urls(response: FindThreatMatchesResponse) -> Vec<String> {
    let mut seen = HashSet::new();
    response
        .matches
        .into_iter()
        .map(|m| m.threat.url.into_owned())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[async_trait]
impl SafeBrowsingService for GoogleSafeBrowsing {
    async fn find_threats(&self, urls: &[String]) -> Result<Vec<String>, SafeBrowsingError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.lookup_url())
            .header(API_KEY_HEADER, self.settings.api_key.as_str())
            .json(&self.request_body(urls))
            .send()
            .await
            .map_err(|e| SafeBrowsingError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SafeBrowsingError::Status(status.as_u16()));
        }

        let body: FindThreatMatchesResponse = response
            .json()
            .await
            .map_err(|e| SafeBrowsingError::Decode(e.without_url().to_string()))?;

        let threats = threat_urls(body);
        tracing::debug!(
            checked = urls.len(),
            threats = threats.len(),
            "Safe browsing lookup completed"
        );
        Ok(threats)
    }
}
