//! Fixed-window rate limiter.
//!
//! # Algorithm
//! ```text
//! check(key, now):
//!     state = windows[key] or {count: 0, window_start: now}
//!     if now - window_start >= window: window_start = now, count = 0
//!     if count < max_requests: count += 1 → allow
//!     else → deny, retry_after = window - (now - window_start)
//! ```
//!
//! Counts from an elapsed window are discarded, not carried over.
//!
//! # Concurrency
//! Per-key state lives in a `DashMap`. The read-modify-write for one key runs
//! under that key's shard lock, so concurrent checks for the same key can
//! never admit more than `max_requests` per window.
//!
//! # Memory
//! A key whose window has elapsed carries no information (the next check
//! would reset it anyway), so it can be dropped. `spawn_sweeper` sweeps such
//! keys on a timer. Without a running sweeper, `check` sweeps at most once
//! per window instead.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::security::client_key::ClientKey;
use crate::security::clock::{Clock, SystemClock};

/// Errors raised while constructing a limiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    /// Non-positive or non-finite limits.
    #[error("invalid rate limit config: {0}")]
    InvalidConfig(String),
}

/// Immutable limiter settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    max_requests: u32,
    window: Duration,
}

impl RateLimiterConfig {
    /// Build a config. `max_requests = 0` is valid and denies everything.
    pub fn new(max_requests: u32, window_seconds: f64) -> Result<Self, RateLimitError> {
        if !window_seconds.is_finite() || window_seconds <= 0.0 {
            return Err(RateLimitError::InvalidConfig(format!(
                "window_seconds must be a positive number, got {}",
                window_seconds
            )));
        }
        let window = Duration::try_from_secs_f64(window_seconds).map_err(|e| {
            RateLimitError::InvalidConfig(format!("window_seconds out of range: {}", e))
        })?;
        if window.is_zero() {
            return Err(RateLimitError::InvalidConfig(format!(
                "window_seconds {} rounds to zero",
                window_seconds
            )));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    /// Build a config from signed input, rejecting negative quotas.
    pub fn from_signed(max_requests: i64, window_seconds: f64) -> Result<Self, RateLimitError> {
        let max_requests = u32::try_from(max_requests).map_err(|_| {
            RateLimitError::InvalidConfig(format!(
                "max_requests must be between 0 and {}, got {}",
                u32::MAX,
                max_requests
            ))
        })?;
        Self::new(max_requests, window_seconds)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Time until the current window ends. Zero when allowed.
    pub retry_after: Duration,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
        }
    }

    fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
        }
    }

    /// `retry_after` rounded up to whole seconds, at least 1.
    /// This is the value sent in the `Retry-After` header.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let rounded = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateWindowState {
    count: u32,
    window_start: Instant,
}

impl RateWindowState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    fn admit(&mut self, now: Instant, config: &RateLimiterConfig) -> Decision {
        if self.is_expired(now, config.window) {
            self.window_start = now;
            self.count = 0;
        }

        if self.count < config.max_requests {
            self.count += 1;
            Decision::allow()
        } else {
            let elapsed = now.saturating_duration_since(self.window_start);
            Decision::deny(config.window.saturating_sub(elapsed))
        }
    }
}

/// In-memory per-key admission control.
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: DashMap<ClientKey, RateWindowState>,
    clock: Arc<dyn Clock>,
    /// Reference point for `last_sweep_nanos`.
    origin: Instant,
    last_sweep_nanos: AtomicU64,
    /// Set while a `spawn_sweeper` task owns eviction.
    background_sweep: AtomicBool,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_keys", &self.windows.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter backed by the system clock.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected time source.
    pub fn with_clock(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let origin = clock.now();
        Self {
            config,
            windows: DashMap::new(),
            clock,
            origin,
            last_sweep_nanos: AtomicU64::new(0),
            background_sweep: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Decide whether `key` may proceed at `now`.
    pub fn check(&self, key: &ClientKey, now: Instant) -> Decision {
        if self.config.max_requests == 0 {
            return Decision::deny(self.config.window);
        }

        self.maybe_sweep(now);

        if let Some(mut state) = self.windows.get_mut(key) {
            return state.admit(now, &self.config);
        }

        self.windows
            .entry(key.clone())
            .or_insert_with(|| RateWindowState::new(now))
            .admit(now, &self.config)
    }

    /// Decide using the limiter's own clock.
    pub fn check_now(&self, key: &ClientKey) -> Decision {
        self.check(key, self.clock.now())
    }

    /// Number of keys currently holding window state.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop every key whose window has elapsed at `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let window = self.config.window;
        let before = self.windows.len();
        self.windows.retain(|_, state| !state.is_expired(now, window));
        let remaining = self.windows.len();
        let evicted = before.saturating_sub(remaining);

        metrics::record_limiter_sweep(evicted, remaining);
        if evicted > 0 {
            tracing::debug!(evicted, remaining, "Evicted idle rate limit windows");
        }
        evicted
    }

    /// Sweep at most once per window; one caller wins the race, the rest skip.
    fn maybe_sweep(&self, now: Instant) {
        if self.background_sweep.load(Ordering::Acquire) {
            return;
        }

        let window_nanos = u64::try_from(self.config.window.as_nanos()).unwrap_or(u64::MAX);
        let elapsed = u64::try_from(now.saturating_duration_since(self.origin).as_nanos())
            .unwrap_or(u64::MAX);
        let last = self.last_sweep_nanos.load(Ordering::Relaxed);

        if elapsed.saturating_sub(last) < window_nanos {
            return;
        }
        if self
            .last_sweep_nanos
            .compare_exchange(last, elapsed, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired(now);
        }
    }
}

/// Run `purge_expired` every window until shutdown is signalled. Inline
/// sweeping in `check` is suspended while the task runs.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let period = limiter.config().window();
    limiter.background_sweep.store(true, Ordering::Release);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    limiter.purge_expired(limiter.now());
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
        limiter.background_sweep.store(false, Ordering::Release);
    })
}
