//! Client identity for rate-limit bucketing.
//!
//! # Resolution order
//! 1. Authenticated principal (`Principal` request extension)
//! 2. First `X-Forwarded-For` hop, only when the gateway sits behind a trusted proxy
//! 3. Peer IP from `ConnectInfo`
//! 4. The shared `"unknown"` bucket
//!
//! Extraction never fails. Missing metadata degrades to a single shared
//! bucket instead of rejecting the request.

use axum::extract::ConnectInfo;
use axum::http::Request;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Key used when nothing identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Opaque identity used as the limiter's lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The fallback key shared by all unidentified clients.
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    fn from_ip(ip: IpAddr) -> Self {
        Self(format!("ip:{}", ip))
    }

    fn from_principal(principal: &Principal) -> Self {
        Self(format!("principal:{}", principal.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Authenticated caller identity attached by an upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

/// Derives a [`ClientKey`] from request metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientKeyExtractor {
    trust_forwarded_for: bool,
}

impl ClientKeyExtractor {
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self { trust_forwarded_for }
    }

    pub fn extract<B>(&self, request: &Request<B>) -> ClientKey {
        if let Some(principal) = request.extensions().get::<Principal>() {
            if !principal.0.is_empty() {
                return ClientKey::from_principal(principal);
            }
        }

        if self.trust_forwarded_for {
            if let Some(ip) = forwarded_client_ip(request) {
                return ClientKey::from_ip(ip);
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientKey::from_ip(addr.ip()))
            .unwrap_or_else(ClientKey::unknown)
    }
}

/// Left-most address in `X-Forwarded-For`, if it parses.
fn forwarded_client_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .headers()
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/api/conversations")
    }

    #[test]
    fn test_missing_metadata_falls_back_to_unknown() {
        let req = request().body(Body::empty()).unwrap();
        let key = ClientKeyExtractor::default().extract(&req);
        assert_eq!(key, ClientKey::unknown());
        assert_eq!(key.as_str(), "unknown");
    }

    #[test]
    fn test_peer_address_is_used() {
        let mut req = request().body(Body::empty()).unwrap();
        let peer: SocketAddr = "10.1.2.3:55000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));

        let key = ClientKeyExtractor::default().extract(&req);
        assert_eq!(key.as_str(), "ip:10.1.2.3");
    }

    #[test]
    fn test_same_ip_different_ports_share_a_key() {
        let extractor = ClientKeyExtractor::default();
        let mut a = request().body(Body::empty()).unwrap();
        a.extensions_mut()
            .insert(ConnectInfo("10.1.2.3:1000".parse::<SocketAddr>().unwrap()));
        let mut b = request().body(Body::empty()).unwrap();
        b.extensions_mut()
            .insert(ConnectInfo("10.1.2.3:2000".parse::<SocketAddr>().unwrap()));

        assert_eq!(extractor.extract(&a), extractor.extract(&b));
    }

    #[test]
    fn test_principal_wins_over_address() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.1.2.3:1000".parse::<SocketAddr>().unwrap()));
        req.extensions_mut().insert(Principal("user-42".into()));

        let key = ClientKeyExtractor::default().extract(&req);
        assert_eq!(key.as_str(), "principal:user-42");
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let mut req = request()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.0.0.1:1000".parse::<SocketAddr>().unwrap()));

        assert_eq!(
            ClientKeyExtractor::new(false).extract(&req).as_str(),
            "ip:10.0.0.1"
        );
        assert_eq!(
            ClientKeyExtractor::new(true).extract(&req).as_str(),
            "ip:203.0.113.9"
        );
    }

    #[test]
    fn test_garbage_forwarded_for_falls_through() {
        let req = request()
            .header("X-Forwarded-For", "not-an-ip")
            .body(Body::empty())
            .unwrap();

        assert_eq!(ClientKeyExtractor::new(true).extract(&req), ClientKey::unknown());
    }
}
