//! Loopback HTTP stand-in for the ML classification service
//!
//! Serves `/predict`, `/algorithms` and `/health` on an ephemeral port so the
//! real HTTP backend client can be exercised end to end.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a mock endpoint answers with
#[derive(Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Text(StatusCode, String),
}

impl IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        match self {
            Reply::Json(status, body) => (status, Json(body)).into_response(),
            Reply::Text(status, body) => (status, body).into_response(),
        }
    }
}

/// Builder for a mock ML service
#[derive(Clone)]
pub struct MockMlService {
    predict: Reply,
    algorithms: Reply,
    health: Reply,
    latency: Option<Duration>,
}

impl MockMlService {
    pub fn new() -> Self {
        Self {
            predict: Reply::Json(StatusCode::OK, super::mock_backend::caesar_payload()),
            algorithms: Reply::Json(
                StatusCode::OK,
                json!({
                    "algorithms": ["Vigenere", "Substitution", "Transposition", "Modern"],
                    "description": "Supported cryptographic algorithms for prediction"
                }),
            ),
            health: Reply::Json(
                StatusCode::OK,
                json!({"status": "healthy", "service": "ML Crypto Predictor"}),
            ),
            latency: None,
        }
    }

    pub fn with_predict(mut self, reply: Reply) -> Self {
        self.predict = reply;
        self
    }

    pub fn with_algorithms(mut self, reply: Reply) -> Self {
        self.algorithms = reply;
        self
    }

    pub fn with_health(mut self, reply: Reply) -> Self {
        self.health = reply;
        self
    }

    /// Delay every `/predict` answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Bind an ephemeral loopback port and serve until the runtime shuts down
    pub async fn spawn(self) -> RunningMlService {
        let recorded = Arc::new(Recorded::default());
        let state = MockState {
            config: Arc::new(self),
            recorded: recorded.clone(),
        };

        let app = Router::new()
            .route("/predict", post(predict))
            .route("/algorithms", get(algorithms))
            .route("/health", get(health))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningMlService {
            base_url: format!("http://{}", addr),
            recorded,
        }
    }
}

#[derive(Default)]
struct Recorded {
    predict_calls: AtomicU32,
    bodies: Mutex<Vec<Value>>,
}

#[derive(Clone)]
struct MockState {
    config: Arc<MockMlService>,
    recorded: Arc<Recorded>,
}

async fn predict(State(state): State<MockState>, Json(body): Json<Value>) -> Reply {
    state.recorded.predict_calls.fetch_add(1, Ordering::SeqCst);
    state.recorded.bodies.lock().unwrap().push(body);

    if let Some(latency) = state.config.latency {
        tokio::time::sleep(latency).await;
    }

    state.config.predict.clone()
}

async fn algorithms(State(state): State<MockState>) -> Reply {
    state.config.algorithms.clone()
}

async fn health(State(state): State<MockState>) -> Reply {
    state.config.health.clone()
}

/// Handle to a spawned mock service
pub struct RunningMlService {
    pub base_url: String,
    recorded: Arc<Recorded>,
}

impl RunningMlService {
    pub fn predict_calls(&self) -> u32 {
        self.recorded.predict_calls.load(Ordering::SeqCst)
    }

    /// Every `/predict` request body received, in order
    pub fn predict_bodies(&self) -> Vec<Value> {
        self.recorded.bodies.lock().unwrap().clone()
    }
}

/// A loopback URL nothing is listening on
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
