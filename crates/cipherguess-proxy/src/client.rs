//! Client for a running orchestrator, used by the `guess` and `algorithms` commands

use anyhow::{bail, Context, Result};
use cipherguess_core::{AlgorithmList, ClassificationRequest, GuessEnvelope};
use serde_json::Value;
use std::time::Duration;

pub struct OrchestratorClient {
    client: reqwest::Client,
    base_url: String,
}

impl OrchestratorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn guess(&self, ciphertext: &str) -> Result<GuessEnvelope> {
        let response = self
            .client
            .post(format!("{}/guess", self.base_url))
            .json(&ClassificationRequest::new(ciphertext))
            .send()
            .await
            .with_context(|| format!("failed to reach orchestrator at {}", self.base_url))?;

        let status = response.status();
        let body: Value = response.json().await.context("orchestrator sent invalid JSON")?;

        if !status.is_success() {
            bail!("{} ({})", describe_error(&body), status);
        }

        Ok(serde_json::from_value(body)?)
    }

    pub async fn algorithms(&self) -> Result<AlgorithmList> {
        let response = self
            .client
            .get(format!("{}/algorithms", self.base_url))
            .send()
            .await
            .with_context(|| format!("failed to reach orchestrator at {}", self.base_url))?;

        let status = response.status();
        let body: Value = response.json().await.context("orchestrator sent invalid JSON")?;

        if !status.is_success() {
            bail!("{} ({})", describe_error(&body), status);
        }

        Ok(serde_json::from_value(body)?)
    }
}

/// `error` plus `details` when the orchestrator sent them
fn describe_error(body: &Value) -> String {
    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("request failed");

    match body.get("details").and_then(Value::as_str) {
        Some(details) => format!("{error}: {details}"),
        None => error.to_string(),
    }
}
