//! GoPlus-backed threat intel client.
//!
//! Configured from `GOPLUS_API_KEY` / `GOPLUS_API_SECRET`; absence of
//! either is legal and turns every call into an `unavailable` result.
//! Each endpoint carries a hard deadline; the internal helpers return
//! `IntelError` and the trait surface maps every failure to degradation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::IntelError;

use super::{
    AddressReport, AddressSecurity, PhishingCheck, SimulationRequest, SimulationResult,
    ThreatIntel,
};

const DEFAULT_BASE_URL: &str = "https://api.gopluslabs.io";
const ENDPOINT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
struct Credentials {
    api_key: String,
    api_secret: String,
}

/// HTTP client for the GoPlus security API.
#[derive(Debug, Clone)]
pub struct GoPlusClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl GoPlusClient {
    /// Build from the process environment. Returns a degraded (but usable)
    /// client when credentials are absent.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GOPLUS_API_KEY").ok().filter(|v| !v.is_empty());
        let api_secret = std::env::var("GOPLUS_API_SECRET")
            .ok()
            .filter(|v| !v.is_empty());
        let credentials = match (api_key, api_secret) {
            (Some(api_key), Some(api_secret)) => Some(Credentials { api_key, api_secret }),
            _ => None,
        };
        Self::with_base_url(DEFAULT_BASE_URL, credentials.map(|c| (c.api_key, c.api_secret)))
    }

    /// Point the client at a different host (tests use a local mock
    /// server).
    pub fn with_base_url(base_url: &str, credentials: Option<(String, String)>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(ENDPOINT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: credentials.map(|(api_key, api_secret)| Credentials {
                api_key,
                api_secret,
            }),
        }
    }

    fn creds(&self) -> Result<&Credentials, IntelError> {
        self.credentials.as_ref().ok_or(IntelError::NotConfigured)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, IntelError> {
        let creds = self.creds()?;
        let url = format!("{}{path}", self.base_url);
        let request = self
            .client
            .get(&url)
            .header("X-API-KEY", &creds.api_key)
            .header("X-API-SECRET", &creds.api_secret)
            .query(query);

        let deadline = Duration::from_secs(ENDPOINT_TIMEOUT_SECS);
        let response = tokio::time::timeout(deadline, request.send())
            .await
            .map_err(|_| IntelError::Deadline(ENDPOINT_TIMEOUT_SECS))??;
        if !response.status().is_success() {
            return Err(IntelError::Status(response.status().as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| IntelError::Decode(e.to_string()))
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, IntelError> {
        let creds = self.creds()?;
        let url = format!("{}{path}", self.base_url);
        let request = self
            .client
            .post(&url)
            .header("X-API-KEY", &creds.api_key)
            .header("X-API-SECRET", &creds.api_secret)
            .json(body);

        let deadline = Duration::from_secs(ENDPOINT_TIMEOUT_SECS);
        let response = tokio::time::timeout(deadline, request.send())
            .await
            .map_err(|_| IntelError::Deadline(ENDPOINT_TIMEOUT_SECS))??;
        if !response.status().is_success() {
            return Err(IntelError::Status(response.status().as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| IntelError::Decode(e.to_string()))
    }

    async fn phishing_inner(&self, url: &str) -> Result<PhishingCheck, IntelError> {
        let body: PhishingResponse = self
            .get_json("/api/v1/phishing_site", &[("url", url.to_string())])
            .await?;
        Ok(PhishingCheck {
            is_phishing: body.result.phishing_site == 1,
            unavailable: false,
        })
    }

    async fn address_inner(
        &self,
        chain_id: u64,
        addresses: &[String],
    ) -> Result<AddressReport, IntelError> {
        let joined = addresses
            .iter()
            .map(|a| a.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        let body: AddressResponse = self
            .get_json(
                "/api/v1/address_security",
                &[
                    ("chain_id", chain_id.to_string()),
                    ("addresses", joined),
                ],
            )
            .await?;

        let addresses = body
            .result
            .into_iter()
            .map(|(address, entry)| {
                (
                    address.to_ascii_lowercase(),
                    AddressSecurity {
                        is_blacklisted: entry.blacklist_doubt == "1",
                        is_phishing_activities: entry.phishing_activities == "1",
                        is_stealing_attack: entry.stealing_attack == "1",
                        is_honeypot_related_address: entry.honeypot_related_address == "1",
                    },
                )
            })
            .collect();
        Ok(AddressReport {
            addresses,
            unavailable: false,
        })
    }

    async fn simulate_inner(
        &self,
        request: &SimulationRequest,
    ) -> Result<SimulationResult, IntelError> {
        let mut result: SimulationResult = self
            .post_json("/api/v1/transaction_simulation", request)
            .await?;
        result.unavailable = false;
        Ok(result)
    }
}

#[async_trait]
impl ThreatIntel for GoPlusClient {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn phishing_site(&self, url: &str) -> PhishingCheck {
        match self.phishing_inner(url).await {
            Ok(check) => check,
            Err(error) => {
                tracing::debug!(%error, "phishing check unavailable");
                PhishingCheck::unavailable()
            }
        }
    }

    async fn address_security(&self, chain_id: u64, addresses: &[String]) -> AddressReport {
        match self.address_inner(chain_id, addresses).await {
            Ok(report) => report,
            Err(error) => {
                tracing::debug!(%error, "address security unavailable");
                AddressReport::unavailable()
            }
        }
    }

    async fn simulate_transaction(&self, request: &SimulationRequest) -> SimulationResult {
        match self.simulate_inner(request).await {
            Ok(result) => result,
            Err(error) => {
                tracing::debug!(%error, "transaction simulation unavailable");
                SimulationResult::unavailable()
            }
        }
    }
}

// Provider wire shapes. GoPlus flags arrive as "0"/"1" strings.

#[derive(Debug, Deserialize)]
struct PhishingResponse {
    #[serde(default)]
    result: PhishingResult,
}

#[derive(Debug, Default, Deserialize)]
struct PhishingResult {
    #[serde(default)]
    phishing_site: u8,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    #[serde(default)]
    result: HashMap<String, AddressEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressEntry {
    #[serde(default)]
    blacklist_doubt: String,
    #[serde(default)]
    phishing_activities: String,
    #[serde(default)]
    stealing_attack: String,
    #[serde(default)]
    honeypot_related_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GoPlusClient {
        GoPlusClient::with_base_url(&server.uri(), Some(("key".into(), "secret".into())))
    }

    #[tokio::test]
    async fn unconfigured_client_degrades() {
        let client = GoPlusClient::with_base_url("http://127.0.0.1:1", None);
        assert!(!client.is_configured());
        assert!(client.phishing_site("https://x.dev").await.unavailable);
        assert!(client.address_security(1, &[]).await.unavailable);
    }

    #[tokio::test]
    async fn phishing_flag_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/phishing_site"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"phishing_site": 1}})),
            )
            .mount(&server)
            .await;

        let check = client_for(&server).phishing_site("https://evil.example").await;
        assert!(check.is_phishing);
        assert!(!check.unavailable);
    }

    #[tokio::test]
    async fn address_flags_parsed_from_string_bits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/address_security"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "0xbad": {
                        "blacklist_doubt": "1",
                        "phishing_activities": "0",
                        "stealing_attack": "0",
                        "honeypot_related_address": "1"
                    }
                }
            })))
            .mount(&server)
            .await;

        let report = client_for(&server)
            .address_security(1, &["0xBAD".into()])
            .await;
        assert!(!report.unavailable);
        let sec = report.for_address("0xbad");
        assert!(sec.is_blacklisted);
        assert!(sec.is_honeypot_related_address);
        assert!(!sec.is_phishing_activities);
    }

    #[tokio::test]
    async fn non_2xx_degrades_instead_of_raising() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/phishing_site"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let check = client_for(&server).phishing_site("https://x.dev").await;
        assert!(check.unavailable);
        assert!(!check.is_phishing);
    }

    #[tokio::test]
    async fn simulation_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/transaction_simulation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "approval_changes": [
                    {"token": "0xtok", "spender": "0xspend", "amount": "max", "is_unlimited": true}
                ],
                "risk_tags": ["APPROVAL_TO_EOA"],
                "risk_level": "high"
            })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .simulate_transaction(&SimulationRequest {
                chain_id: 1,
                from: "0xa".into(),
                to: "0xb".into(),
                value: "0".into(),
                data: "0x".into(),
            })
            .await;
        assert!(result.success);
        assert!(!result.unavailable);
        assert!(result.approval_changes[0].is_unlimited);
        assert_eq!(result.risk_level, crate::patterns::RiskLevel::High);
    }
}
