//! Validation of the classification service URL
//!
//! The service normally runs next to the orchestrator, so loopback and
//! private addresses are accepted. Cloud metadata endpoints and link-local
//! addresses never are.

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    Invalid(#[from] url::ParseError),

    #[error("URL scheme '{0}' is not allowed, use http or https")]
    InvalidScheme(String),

    #[error("Host '{0}' is blocked: metadata and link-local addresses are not allowed")]
    BlockedHost(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL must not carry a query string or fragment")]
    UnexpectedSuffix,
}

/// Hostnames that must never be used as the classification service
const BLOCKED_HOSTNAMES: &[&str] = &[
    "metadata.google.internal",
    "metadata.goog",
    "169.254.169.254",
    "fd00:ec2::254",
];

/// Parse and check a classification service base URL.
pub fn validate_service_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::InvalidScheme(scheme.to_string())),
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let host_lower = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();

    for blocked in BLOCKED_HOSTNAMES {
        if host_lower == *blocked || host_lower.ends_with(&format!(".{}", blocked)) {
            return Err(UrlError::BlockedHost(host.to_string()));
        }
    }

    if let Ok(ip) = host_lower.parse::<IpAddr>() {
        if is_link_local(&ip) {
            return Err(UrlError::BlockedHost(host.to_string()));
        }
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlError::UnexpectedSuffix);
    }

    Ok(url)
}

fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_link_local(),
        // fe80::/10
        IpAddr::V6(ipv6) => (ipv6.segments()[0] & 0xffc0) == 0xfe80,
    }
}
