//! In-memory classification backends for testing
//!
//! Provides configurable implementations of the ClassificationBackend trait
//! for exercising the orchestrator without a network.

use async_trait::async_trait;
use cipherguess_core::{BackendFailure, PredictionResult};
use cipherguess_proxy::ClassificationBackend;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// The Caesar answer used throughout the tests
pub fn caesar_payload() -> Value {
    json!({
        "algorithm": "Caesar",
        "confidence": 0.92,
        "algorithm_probabilities": {"Caesar": 92, "Vigenere": 8},
        "features": {"length": 11, "alpha_ratio": 0.91}
    })
}

/// A configurable mock backend that records what it receives
pub struct MockBackend {
    payload: Value,
    failure: Option<BackendFailure>,
    panic_on_predict: bool,
    call_count: AtomicU32,
    received: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            payload: caesar_payload(),
            failure: None,
            panic_on_predict: false,
            call_count: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Set the payload `predict` answers with
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Make every operation fail with `failure`
    pub fn with_failure(mut self, failure: BackendFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Make `predict` panic, for testing the panic fallback
    pub fn panicking() -> Self {
        Self {
            panic_on_predict: true,
            ..Self::new()
        }
    }

    /// Get the number of times predict was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every ciphertext predict was called with, in order
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    fn outcome(&self, ok: Value) -> Result<Value, BackendFailure> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(ok),
        }
    }
}

#[async_trait]
impl ClassificationBackend for MockBackend {
    async fn predict(&self, ciphertext: &str) -> Result<PredictionResult, BackendFailure> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.received.lock().unwrap().push(ciphertext.to_string());

        if self.panic_on_predict {
            panic!("simulated backend panic");
        }

        let payload = self.outcome(self.payload.clone())?;
        Ok(PredictionResult::from_value(payload)?)
    }

    async fn algorithms(&self) -> Result<Value, BackendFailure> {
        self.outcome(json!({
            "algorithms": ["Caesar", "Vigenere", "Substitution", "Transposition"],
            "description": "Supported cryptographic algorithms for prediction"
        }))
    }

    async fn health(&self) -> Result<Value, BackendFailure> {
        self.outcome(json!({"status": "healthy", "service": "ML Crypto Predictor"}))
    }
}
