//! Scope matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Match protocol
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is a raw `starts_with`, no segment awareness
//! - No regex to guarantee O(n) matching

use crate::routing::scope::{ConnectionScope, Protocol};

/// Trait for matching connection scopes against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the scope matches this condition.
    fn matches(&self, scope: &ConnectionScope) -> bool;
}

/// Matches the connection protocol exactly.
#[derive(Debug, Clone)]
pub struct ProtocolMatcher {
    protocol: Protocol,
}

impl ProtocolMatcher {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

impl Matcher for ProtocolMatcher {
    fn matches(&self, scope: &ConnectionScope) -> bool {
        scope.protocol == self.protocol
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, scope: &ConnectionScope) -> bool {
        scope.path.starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, scope: &ConnectionScope) -> bool {
        self.matchers.iter().all(|m| m.matches(scope))
    }
}
