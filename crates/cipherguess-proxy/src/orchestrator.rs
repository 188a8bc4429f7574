//! Core orchestration logic

use chrono::Utc;
use cipherguess_core::{
    ClassificationRequest, CombinedHealth, GuessEnvelope, GuessError,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{ClassificationBackend, HttpBackend};
use crate::config::OrchestratorConfig;

/// Number of ciphertext characters quoted in traces
const PREVIEW_CHARS: usize = 50;

/// Validates classification requests and relays them to the backend.
///
/// Holds no per-request state; clones share the backend handle.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn ClassificationBackend>,
    service_name: Arc<str>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ClassificationBackend>, service_name: impl Into<String>) -> Self {
        let service_name: String = service_name.into();
        Self {
            backend,
            service_name: Arc::from(service_name),
        }
    }

    /// Build an orchestrator talking HTTP to the configured service
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, reqwest::Error> {
        let backend = HttpBackend::from_config(config)?;
        Ok(Self::new(Arc::new(backend), config.service_name.clone()))
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Validate `request`, forward its ciphertext untouched, and wrap the answer.
    pub async fn submit_classification(
        &self,
        request: &ClassificationRequest,
    ) -> Result<GuessEnvelope, GuessError> {
        let ciphertext = match request.ciphertext() {
            Ok(text) => text,
            Err(err) => {
                record_outcome("guess", Err(&err));
                debug!("Rejected classification request: {}", err);
                return Err(err);
            }
        };

        info!(
            chars = ciphertext.chars().count(),
            "Analyzing ciphertext: {}",
            preview(ciphertext)
        );

        let prediction = match self.backend.predict(ciphertext).await {
            Ok(prediction) => prediction,
            Err(failure) => {
                let err = GuessError::from(failure);
                record_outcome("guess", Err(&err));
                warn!("Prediction failed ({}): {}", err.kind().as_str(), err);
                return Err(err);
            }
        };

        info!("Prediction received: {}", prediction.algorithm);
        record_outcome("guess", Ok(()));

        Ok(GuessEnvelope::new(prediction, Utc::now()))
    }

    /// Relay the backend's algorithm list.
    ///
    /// Every failure is reported as a backend error, unreachable included.
    pub async fn list_algorithms(&self) -> Result<Value, GuessError> {
        let outcome = self.backend.algorithms().await.map_err(GuessError::Backend);

        match &outcome {
            Ok(_) => record_outcome("algorithms", Ok(())),
            Err(err) => {
                record_outcome("algorithms", Err(err));
                warn!("Error fetching algorithms: {}", err);
            }
        }

        outcome
    }

    /// Combine orchestrator liveness with the backend's health payload
    pub async fn check_health(&self) -> CombinedHealth {
        match self.backend.health().await {
            Ok(payload) => CombinedHealth::healthy(self.service_name(), payload, Utc::now()),
            Err(failure) => {
                warn!("Classification service unhealthy: {}", failure);
                CombinedHealth::unhealthy(self.service_name(), failure.to_string())
            }
        }
    }
}

fn record_outcome(operation: &'static str, outcome: Result<(), &GuessError>) {
    let label = match outcome {
        Ok(()) => "success",
        Err(err) => err.kind().as_str(),
    };
    metrics::counter!("cipherguess_outcomes_total", "operation" => operation, "outcome" => label)
        .increment(1);
}

/// First characters of `text` for logging, marked when cut short
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cipherguess_core::{BackendFailure, ErrorKind, HealthStatus, PredictionResult};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every ciphertext it is asked to classify
    #[derive(Default)]
    struct RecordingBackend {
        seen: Mutex<Vec<String>>,
        failure: Option<BackendFailure>,
    }

    impl RecordingBackend {
        fn failing(failure: BackendFailure) -> Self {
            Self {
                failure: Some(failure),
                ..Default::default()
            }
        }

        fn result<T>(&self, ok: T) -> Result<T, BackendFailure> {
            match &self.failure {
                Some(failure) => Err(failure.clone()),
                None => Ok(ok),
            }
        }
    }

    #[async_trait]
    impl ClassificationBackend for RecordingBackend {
        async fn predict(&self, ciphertext: &str) -> Result<PredictionResult, BackendFailure> {
            self.seen.lock().unwrap().push(ciphertext.to_string());
            let prediction = PredictionResult::from_value(json!({
                "algorithm": "Caesar",
                "confidence": 0.92
            }))
            .unwrap();
            self.result(prediction)
        }

        async fn algorithms(&self) -> Result<Value, BackendFailure> {
            self.result(json!({"algorithms": ["Caesar", "Vigenere"]}))
        }

        async fn health(&self) -> Result<Value, BackendFailure> {
            self.result(json!({"status": "healthy"}))
        }
    }

    fn orchestrator(backend: Arc<RecordingBackend>) -> Orchestrator {
        Orchestrator::new(backend, "test-service")
    }

    fn unreachable() -> BackendFailure {
        BackendFailure::Unreachable {
            url: "http://localhost:5001".to_string(),
            reason: "Connection refused (os error 111)".to_string(),
        }
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("KHOOR"), "KHOOR");
        let long = "é".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "é".repeat(50)));
        assert_eq!(preview(&"a".repeat(50)), "a".repeat(50));
    }

    #[tokio::test]
    async fn test_forwards_untrimmed_ciphertext() {
        let backend = Arc::new(RecordingBackend::default());
        let envelope = orchestrator(backend.clone())
            .submit_classification(&ClassificationRequest::new("  KHOOR ZRUOG  "))
            .await
            .unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.prediction.algorithm, "Caesar");
        assert_eq!(*backend.seen.lock().unwrap(), vec!["  KHOOR ZRUOG  ".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_request_never_reaches_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let orchestrator = orchestrator(backend.clone());

        for request in [ClassificationRequest::default(), ClassificationRequest::new("   ")] {
            let err = orchestrator.submit_classification(&request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_keeps_its_kind_for_guess() {
        let backend = Arc::new(RecordingBackend::failing(unreachable()));
        let err = orchestrator(backend)
            .submit_classification(&ClassificationRequest::new("abc"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnreachable);
    }

    #[tokio::test]
    async fn test_algorithms_collapse_unreachable() {
        let backend = Arc::new(RecordingBackend::failing(unreachable()));
        let err = orchestrator(backend).list_algorithms().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[tokio::test]
    async fn test_health() {
        let healthy = orchestrator(Arc::new(RecordingBackend::default()))
            .check_health()
            .await;
        assert!(healthy.is_healthy());
        assert_eq!(healthy.service, "test-service");
        assert_eq!(healthy.ml_service, json!({"status": "healthy"}));

        let unhealthy = orchestrator(Arc::new(RecordingBackend::failing(
            BackendFailure::Timeout(std::time::Duration::from_secs(5)),
        )))
        .check_health()
        .await;
        assert_eq!(unhealthy.status, HealthStatus::Unhealthy);
        assert_eq!(unhealthy.ml_service, json!("unavailable"));
        assert_eq!(unhealthy.error.as_deref(), Some("no response within 5s"));
    }
}
