//! Bundle relay client
//!
//! JSON-RPC over HTTP against one or more relay endpoints. Submission
//! races every endpoint and takes the first success; status polling goes
//! to the endpoint that won the race. Individual endpoint failures are
//! log-only as long as another endpoint can still succeed.

use anyhow::Context;
use serde::Deserialize;
use serde_json::json;

/// A bundle accepted by a relay: the id to poll and where to poll it
#[derive(Debug, Clone, PartialEq)]
pub struct BundleSubmission {
    pub endpoint: String,
    pub bundle_id: String,
}

/// Per-bundle status entry from `getBundleStatuses`
#[derive(Debug, Clone, Deserialize)]
pub struct BundleStatus {
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl BundleStatus {
    /// Terminal statuses that count as success
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

#[derive(Debug, Deserialize)]
struct StatusesResponse {
    result: Option<StatusesResult>,
}

#[derive(Debug, Deserialize)]
struct StatusesResult {
    value: Option<Vec<BundleStatus>>,
}

/// HTTP client for the relay endpoints
pub struct RelayClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
}

impl RelayClient {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints)
    }

    pub fn with_client(http: reqwest::Client, endpoints: Vec<String>) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Submit the bundle to every endpoint concurrently and return the
    /// first acceptance. Fails only when all endpoints fail.
    pub async fn send_bundle(&self, transactions: &[String]) -> anyhow::Result<BundleSubmission> {
        anyhow::ensure!(!self.endpoints.is_empty(), "no relay endpoints configured");

        let attempts = self.endpoints.iter().map(|endpoint| {
            Box::pin(async move {
                self.send_bundle_to(endpoint, transactions)
                    .await
                    .map_err(|e| {
                        tracing::warn!(%endpoint, error = %e, "relay submission failed");
                        e
                    })
            })
        });

        match futures::future::select_ok(attempts).await {
            Ok((submission, _)) => {
                tracing::info!(
                    endpoint = %submission.endpoint,
                    bundle_id = %submission.bundle_id,
                    "bundle accepted"
                );
                Ok(submission)
            }
            Err(last) => Err(last.context("all relay endpoints failed")),
        }
    }

    async fn send_bundle_to(
        &self,
        endpoint: &str,
        transactions: &[String],
    ) -> anyhow::Result<BundleSubmission> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendBundle",
            "params": [transactions, { "encoding": "base64" }],
        });

        let response = self
            .http
            .post(format!("{}/api/v1/bundles", endpoint))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let value: serde_json::Value = response.json().await?;

        if !status.is_success() {
            anyhow::bail!("relay returned HTTP {}", status);
        }
        if let Some(error) = value.get("error") {
            anyhow::bail!("relay rejected bundle: {}", error);
        }
        let bundle_id = value
            .get("result")
            .and_then(|v| v.as_str())
            .context("sendBundle response missing result")?;

        Ok(BundleSubmission {
            endpoint: endpoint.to_string(),
            bundle_id: bundle_id.to_string(),
        })
    }

    /// Look up bundle statuses on a specific endpoint. An empty vec
    /// means "not found yet"; a malformed response is an error.
    pub async fn get_bundle_statuses(
        &self,
        endpoint: &str,
        bundle_id: &str,
    ) -> anyhow::Result<Vec<BundleStatus>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBundleStatuses",
            "params": [[bundle_id]],
        });

        let response: StatusesResponse = self
            .http
            .post(format!("{}/api/v1/getBundleStatuses", endpoint))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        response
            .result
            .and_then(|r| r.value)
            .context("unexpected getBundleStatuses response shape")
    }
}
