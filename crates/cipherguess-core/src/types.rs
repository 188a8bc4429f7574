//! Core types for cipherguess
//!
//! Wire units: `confidence` is a fraction in `[0, 1]`, every entry of
//! `algorithm_probabilities` is a percentage in `[0, 100]`. Neither is rescaled
//! on the way through the orchestrator.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::error::{Error, GuessError, Result};

/// Message returned when a request carries no usable ciphertext
pub const CIPHERTEXT_REQUIRED: &str = "Ciphertext is required";

/// Format a timestamp the way every envelope carries it (`2024-05-01T12:00:00.000Z`)
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A caller's request to classify a block of ciphertext
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
}

impl ClassificationRequest {
    pub fn new(ciphertext: impl Into<String>) -> Self {
        Self {
            ciphertext: Some(ciphertext.into()),
        }
    }

    /// Decode a raw request body.
    ///
    /// An empty body and a `null` ciphertext both decode to a request without
    /// ciphertext; rejecting those is left to [`Self::ciphertext`].
    pub fn from_body(body: &[u8]) -> std::result::Result<Self, GuessError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| GuessError::validation(format!("Request body must be valid JSON: {e}")))?;

        match value.get("ciphertext") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::String(text)) => Ok(Self::new(text.clone())),
            Some(_) => Err(GuessError::validation("Ciphertext must be a string")),
        }
    }

    /// The ciphertext exactly as received.
    ///
    /// Whitespace only counts for the emptiness check; the returned slice is
    /// never trimmed.
    pub fn ciphertext(&self) -> std::result::Result<&str, GuessError> {
        match self.ciphertext.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GuessError::validation(CIPHERTEXT_REQUIRED)),
        }
    }
}

/// A numeric field kept in the exact representation the backend sent
/// (`92` stays `92`, `0.91` stays `0.91`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(Number);

impl Score {
    /// Build a score from a float; `None` for NaN or infinity
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self)
    }

    pub fn value(&self) -> f64 {
        self.0.as_f64().unwrap_or(f64::NAN)
    }
}

impl From<u64> for Score {
    fn from(value: u64) -> Self {
        Self(Number::from(value))
    }
}

/// Statistical features of the input text, as computed by the backend.
///
/// Every field is optional: a backend that could not compute a statistic
/// omits it, and the omission is kept all the way to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_ratio: Option<Score>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digit_ratio: Option<Score>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_ratio: Option<Score>,

    /// Shannon entropy in bits per character
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy: Option<Score>,

    /// Index of coincidence over the alphabetic characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ic: Option<Score>,

    /// Chi-square distance from English letter frequencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chi_square: Option<Score>,

    /// Statistics this orchestrator does not know about, relayed as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextStatistics {
    fn validate(&self) -> Result<()> {
        let ratios = [
            ("alpha_ratio", &self.alpha_ratio),
            ("digit_ratio", &self.digit_ratio),
            ("symbol_ratio", &self.symbol_ratio),
        ];
        for (name, ratio) in ratios {
            if let Some(score) = ratio {
                check_range(name, score.value(), 0.0, 1.0)?;
            }
        }

        let unbounded = [
            ("entropy", &self.entropy),
            ("ic", &self.ic),
            ("chi_square", &self.chi_square),
        ];
        for (name, stat) in unbounded {
            if let Some(score) = stat {
                check_range(name, score.value(), 0.0, f64::INFINITY)?;
            }
        }

        Ok(())
    }
}

/// The backend's answer to a `predict` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Most likely algorithm label
    pub algorithm: String,

    /// Certainty in `algorithm`, fraction in `[0, 1]`
    pub confidence: Score,

    /// Belief per candidate algorithm, percentage in `[0, 100]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm_probabilities: Option<BTreeMap<String, Score>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<TextStatistics>,

    /// Any other top-level fields, relayed as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PredictionResult {
    /// Decode and validate a backend payload
    pub fn from_value(value: Value) -> Result<Self> {
        let result: Self = serde_json::from_value(value)?;
        result.validate()?;
        Ok(result)
    }

    /// Check every documented range of the prediction contract.
    ///
    /// The probabilities are not required to sum to 100.
    pub fn validate(&self) -> Result<()> {
        if self.algorithm.trim().is_empty() {
            return Err(Error::invalid_payload("`algorithm` is empty"));
        }

        check_range("confidence", self.confidence.value(), 0.0, 1.0)?;

        if let Some(probabilities) = &self.algorithm_probabilities {
            for (name, probability) in probabilities {
                check_range(
                    &format!("algorithm_probabilities.{name}"),
                    probability.value(),
                    0.0,
                    100.0,
                )?;
            }
        }

        if let Some(features) = &self.features {
            features.validate()?;
        }

        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::invalid_payload(format!(
            "`{field}` = {value} is outside [{min}, {max}]"
        )));
    }
    Ok(())
}

/// Successful `/guess` response: the prediction plus orchestrator metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessEnvelope {
    pub success: bool,

    #[serde(flatten)]
    pub prediction: PredictionResult,

    /// When the orchestrator built this response, not when the backend answered
    pub timestamp: String,
}

impl GuessEnvelope {
    pub fn new(mut prediction: PredictionResult, at: DateTime<Utc>) -> Self {
        // The envelope owns these keys; backend copies would serialize twice.
        prediction.extra.remove("success");
        prediction.extra.remove("timestamp");

        Self {
            success: true,
            prediction,
            timestamp: iso_timestamp(at),
        }
    }
}

/// The set of labels the backend can currently produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmList {
    pub algorithms: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Orchestrator liveness combined with the backend's own health payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedHealth {
    pub status: HealthStatus,
    pub service: String,

    /// Backend payload when healthy, the string `"unavailable"` otherwise
    pub ml_service: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CombinedHealth {
    pub fn healthy(service: impl Into<String>, backend: Value, at: DateTime<Utc>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: service.into(),
            ml_service: backend,
            timestamp: Some(iso_timestamp(at)),
            error: None,
        }
    }

    pub fn unhealthy(service: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            service: service.into(),
            ml_service: Value::String("unavailable".to_string()),
            timestamp: None,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
