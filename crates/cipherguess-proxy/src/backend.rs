//! Classification backend client
//!
//! The ML service is an opaque HTTP dependency with three operations:
//! `POST /predict`, `GET /algorithms` and `GET /health`. Every call is a single
//! attempt bounded by the configured timeout, and every failure comes back as a
//! [`BackendFailure`] variant rather than a raw transport error.

use async_trait::async_trait;
use cipherguess_core::{AlgorithmList, BackendFailure, PredictionResult};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::OrchestratorConfig;

/// Longest backend error body quoted back to the caller
const MAX_DETAIL_CHARS: usize = 500;

/// Operations the orchestrator needs from a classification service
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    /// Classify `ciphertext`, which is sent exactly as given
    async fn predict(&self, ciphertext: &str) -> Result<PredictionResult, BackendFailure>;

    /// Raw algorithm-list payload, checked for an `algorithms` array
    async fn algorithms(&self) -> Result<Value, BackendFailure>;

    /// Raw health payload
    async fn health(&self) -> Result<Value, BackendFailure>;
}

#[derive(Serialize)]
struct PredictPayload<'a> {
    ciphertext: &'a str,
}

/// [`ClassificationBackend`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.ml_service_url,
            config.timeout(),
            config.connect_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn call(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, BackendFailure> {
        let start = Instant::now();
        let outcome = self.exchange(request).await;

        metrics::histogram!("cipherguess_backend_latency_us", "operation" => operation)
            .record(start.elapsed().as_micros() as f64);

        match &outcome {
            Ok(_) => debug!("Backend {} answered in {:?}", operation, start.elapsed()),
            Err(failure) => warn!("Backend {} failed: {}", operation, failure),
        }

        outcome
    }

    async fn exchange(&self, request: reqwest::RequestBuilder) -> Result<Value, BackendFailure> {
        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendFailure::Status {
                status: status.as_u16(),
                detail: error_detail(&body, status),
            });
        }

        response.json::<Value>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> BackendFailure {
        if err.is_connect() {
            BackendFailure::Unreachable {
                url: self.base_url.clone(),
                reason: root_cause(&err),
            }
        } else if err.is_timeout() {
            BackendFailure::Timeout(self.timeout)
        } else if err.is_decode() {
            BackendFailure::Malformed(root_cause(&err))
        } else {
            BackendFailure::Transport(root_cause(&err))
        }
    }
}

#[async_trait]
impl ClassificationBackend for HttpBackend {
    async fn predict(&self, ciphertext: &str) -> Result<PredictionResult, BackendFailure> {
        let request = self
            .client
            .post(self.endpoint("predict"))
            .json(&PredictPayload { ciphertext });

        let payload = self.call("predict", request).await?;
        Ok(PredictionResult::from_value(payload)?)
    }

    async fn algorithms(&self) -> Result<Value, BackendFailure> {
        let payload = self
            .call("algorithms", self.client.get(self.endpoint("algorithms")))
            .await?;

        serde_json::from_value::<AlgorithmList>(payload.clone())
            .map_err(|e| BackendFailure::Malformed(e.to_string()))?;

        Ok(payload)
    }

    async fn health(&self) -> Result<Value, BackendFailure> {
        self.call("health", self.client.get(self.endpoint("health")))
            .await
    }
}

/// The backend's own error message when it sent one, else its raw body
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(MAX_DETAIL_CHARS).collect());

    if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        message
    }
}

/// Innermost error message, e.g. "Connection refused (os error 111)"
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
