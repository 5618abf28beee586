//! Connection scope: the protocol and path a request arrived with.
//!
//! # Protocol detection
//! - `Upgrade: websocket` → `WebSocket`
//! - any other `Upgrade` value, or a `CONNECT` → `Other`
//! - everything else → `Http`

use axum::http::{header, Method, Request};
use std::fmt;
use thiserror::Error;

/// Transport protocol of an incoming connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// Plain request/response HTTP.
    Http,
    /// WebSocket upgrade handshake.
    WebSocket,
    /// Anything the gateway does not recognise (lowercased name).
    Other(String),
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("http"),
            Protocol::WebSocket => f.write_str("websocket"),
            Protocol::Other(name) => write!(f, "other({})", name),
        }
    }
}

/// The request did not carry a routable path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("unroutable request target {0:?}")]
    Unroutable(String),
}

/// What the router needs to know about a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionScope {
    pub protocol: Protocol,
    pub path: String,
}

impl ConnectionScope {
    pub fn new(protocol: Protocol, path: impl Into<String>) -> Self {
        Self {
            protocol,
            path: path.into(),
        }
    }

    /// Classify a request. Fails only for targets without an absolute path
    /// (authority-form, asterisk-form).
    pub fn from_request<B>(request: &Request<B>) -> Result<Self, ScopeError> {
        let path = request.uri().path();
        if !path.starts_with('/') {
            return Err(ScopeError::Unroutable(request.uri().to_string()));
        }
        Ok(Self::new(detect_protocol(request), path))
    }
}

fn detect_protocol<B>(request: &Request<B>) -> Protocol {
    if let Some(upgrade) = request.headers().get(header::UPGRADE) {
        let name = upgrade
            .to_str()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase();
        return if name == "websocket" {
            Protocol::WebSocket
        } else {
            Protocol::Other(name)
        };
    }

    if request.method() == Method::CONNECT {
        return Protocol::Other("connect".to_string());
    }

    Protocol::Http
}
