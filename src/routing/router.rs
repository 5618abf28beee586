//! Connection dispatch table.
//!
//! # Table (first match wins)
//! ```text
//! protocol == websocket                    → Messaging
//! path starts with messaging prefix        → Messaging
//! protocol == http && path has api prefix  → Api
//! protocol == http                         → StaticFiles (Api when frontend is off)
//! anything else                            → Messaging
//! ```
//!
//! The last row is a permissive fallback: unrecognised protocols go to the
//! messaging handler instead of being rejected.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Pure: same scope always yields the same destination

use crate::config::RoutingConfig;
use crate::routing::matcher::{AndMatcher, Matcher, PathPrefixMatcher, ProtocolMatcher};
use crate::routing::scope::{ConnectionScope, Protocol};

/// Where a connection is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Messaging,
    Api,
    StaticFiles,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Messaging => "messaging",
            Destination::Api => "api",
            Destination::StaticFiles => "static",
        }
    }
}

#[derive(Debug)]
struct Rule {
    matcher: Box<dyn Matcher>,
    destination: Destination,
}

/// Classifies connections into exactly one [`Destination`].
#[derive(Debug)]
pub struct ConnectionRouter {
    rules: Vec<Rule>,
    fallback: Destination,
    serve_frontend: bool,
}

impl ConnectionRouter {
    pub fn new(messaging_prefix: &str, api_prefix: &str, serve_frontend: bool) -> Self {
        let http_destination = if serve_frontend {
            Destination::StaticFiles
        } else {
            Destination::Api
        };

        let rules = vec![
            Rule {
                matcher: Box::new(ProtocolMatcher::new(Protocol::WebSocket)),
                destination: Destination::Messaging,
            },
            Rule {
                matcher: Box::new(PathPrefixMatcher::new(messaging_prefix)),
                destination: Destination::Messaging,
            },
            Rule {
                matcher: Box::new(AndMatcher::new(vec![
                    Box::new(ProtocolMatcher::new(Protocol::Http)),
                    Box::new(PathPrefixMatcher::new(api_prefix)),
                ])),
                destination: Destination::Api,
            },
            Rule {
                matcher: Box::new(ProtocolMatcher::new(Protocol::Http)),
                destination: http_destination,
            },
        ];

        Self {
            rules,
            fallback: Destination::Messaging,
            serve_frontend,
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(
            &config.messaging_prefix,
            &config.api_prefix,
            config.serve_frontend,
        )
    }

    /// Pick the destination for a scope.
    pub fn route(&self, scope: &ConnectionScope) -> Destination {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(scope))
            .map(|rule| rule.destination)
            .unwrap_or(self.fallback)
    }

    pub fn serves_frontend(&self) -> bool {
        self.serve_frontend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ConnectionRouter {
        ConnectionRouter::new("/realtime", "/api", true)
    }

    fn http(path: &str) -> ConnectionScope {
        ConnectionScope::new(Protocol::Http, path)
    }

    #[test]
    fn test_api_path_routes_to_api() {
        assert_eq!(router().route(&http("/api/conversations")), Destination::Api);
    }

    #[test]
    fn test_websocket_routes_to_messaging() {
        let r = router();
        assert_eq!(
            r.route(&ConnectionScope::new(Protocol::WebSocket, "/realtime")),
            Destination::Messaging
        );
        // Upgrades win regardless of path.
        assert_eq!(
            r.route(&ConnectionScope::new(Protocol::WebSocket, "/api/events")),
            Destination::Messaging
        );
    }

    #[test]
    fn test_messaging_prefix_over_http() {
        assert_eq!(
            router().route(&http("/realtime/?EIO=4&transport=polling")),
            Destination::Messaging
        );
    }

    #[test]
    fn test_other_paths_route_to_static() {
        let r = router();
        assert_eq!(r.route(&http("/index.html")), Destination::StaticFiles);
        assert_eq!(r.route(&http("/")), Destination::StaticFiles);
        assert_eq!(r.route(&http("/conversations/abc")), Destination::StaticFiles);
    }

    #[test]
    fn test_unrecognised_protocol_falls_back_to_messaging() {
        let r = router();
        for path in ["/", "/api/conversations", "/index.html"] {
            assert_eq!(
                r.route(&ConnectionScope::new(Protocol::Other("h2c".into()), path)),
                Destination::Messaging,
                "path {}",
                path
            );
        }
    }

    #[test]
    fn test_frontend_disabled_falls_through_to_api() {
        let r = ConnectionRouter::new("/realtime", "/api", false);
        assert!(!r.serves_frontend());
        assert_eq!(r.route(&http("/index.html")), Destination::Api);
        assert_eq!(r.route(&http("/api/settings")), Destination::Api);
        assert_eq!(r.route(&http("/realtime")), Destination::Messaging);
    }

    #[test]
    fn test_prefixes_come_from_config() {
        let config = RoutingConfig {
            messaging_prefix: "/socket.io".into(),
            api_prefix: "/v2".into(),
            serve_frontend: true,
        };
        let r = ConnectionRouter::from_config(&config);
        assert_eq!(r.route(&http("/socket.io/")), Destination::Messaging);
        assert_eq!(r.route(&http("/v2/items")), Destination::Api);
        assert_eq!(r.route(&http("/api/items")), Destination::StaticFiles);
        assert_eq!(r.route(&http("/realtime")), Destination::StaticFiles);
    }
}
