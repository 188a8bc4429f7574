//! cipherguess Core
//!
//! Contract types shared by the orchestrator and its clients.
//!
//! This crate provides:
//! - The request, prediction, algorithm-list and health types exchanged with callers
//!   and with the classification backend
//! - Boundary validation of backend payloads
//! - The caller-facing error taxonomy and its status-code mapping
//! - A display-ready report of a prediction

pub mod error;
pub mod report;
pub mod types;

pub use error::{BackendFailure, Error, ErrorKind, GuessError, Result};
pub use report::{FeatureValue, PredictionReport};
pub use types::{
    AlgorithmList, ClassificationRequest, CombinedHealth, GuessEnvelope, HealthStatus,
    PredictionResult, Score, TextStatistics, CIPHERTEXT_REQUIRED,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{BackendFailure, ErrorKind, GuessError};
    pub use crate::types::{ClassificationRequest, GuessEnvelope, PredictionResult};
}
