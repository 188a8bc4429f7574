//! Orchestrator configuration
//!
//! Built once at startup from defaults, an optional YAML file, and finally
//! environment variables / command-line flags, then handed to the
//! orchestrator by value. Nothing reads the environment after that.

use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::security::{validate_service_url, UrlError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid ml_service_url: {0}")]
    ServiceUrl(#[from] UrlError),

    #[error("invalid frontend_url '{0}'")]
    FrontendUrl(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Command-line and environment overrides for `serve`
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(short, long, env = "CIPHERGUESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the classification service
    #[arg(short = 'm', long, env = "ML_SERVICE_URL")]
    pub ml_service_url: Option<String>,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// Total time allowed for one classification service call, in seconds
    #[arg(long, env = "ML_SERVICE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Time allowed to establish a connection to the classification service, in seconds
    #[arg(long, env = "ML_SERVICE_CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Classification service base URL
    #[serde(default = "default_ml_service_url")]
    pub ml_service_url: String,

    /// Permitted cross-origin caller
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Name reported by the health endpoint
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl OrchestratorConfig {
    /// Load configuration from file and CLI/environment overrides
    pub fn load(args: &ServeArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(listen) = &args.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(url) = &args.ml_service_url {
            config.ml_service_url = url.clone();
        }
        if let Some(url) = &args.frontend_url {
            config.frontend_url = url.clone();
        }
        if let Some(secs) = args.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(secs) = args.connect_timeout_secs {
            config.connect_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_service_url(&self.ml_service_url)?;

        match url::Url::parse(&self.frontend_url) {
            Ok(url) if url.has_host() => {}
            _ => return Err(ConfigError::FrontendUrl(self.frontend_url.clone())),
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("timeout_secs"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("connect_timeout_secs"));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Origin value for the CORS allow-list, without a trailing slash
    pub fn frontend_origin(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            ml_service_url: default_ml_service_url(),
            frontend_url: default_frontend_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            service_name: default_service_name(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_ml_service_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_service_name() -> String {
    "Crypto Guessing Backend".to_string()
}
