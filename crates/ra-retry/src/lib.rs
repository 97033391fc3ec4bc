// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Exponential backoff with jitter (spec §4.2: "Default 3 attempts total
//! with exponential backoff (1s, 2s, 4s) plus small jitter").
//!
//! Shared between `ra-http` (HTTP transient-error retries) and `ra-oauth`
//! (token endpoint 5xx retries, via `ra-http`).

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An exponential-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Backoff ceiling; computed delays never exceed this.
    pub max_backoff: Duration,
    /// Multiplier applied per additional attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    /// Spec §4.2 default: 3 attempts total (1 initial + 2 retries), backoff
    /// sequence `1s, 2s, 4s` before jitter.
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(4),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Start building a custom policy from spec defaults.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder { inner: RetryPolicy::default() }
    }

    /// Whether `attempt` (0-indexed, counting only retries — not the first
    /// attempt) should be retried.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Compute the backoff delay before retry attempt `attempt` (0-indexed),
    /// including +/-25% jitter, capped at `max_backoff`.
    #[must_use]
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_backoff.as_millis() as f64);
        let jitter_frac = rand::thread_rng().gen_range(0.75..=1.25);
        let jittered_ms = (capped_ms * jitter_frac).min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(jittered_ms.max(0.0) as u64)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    inner: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Set the number of retries after the first attempt.
    #[must_use]
    pub fn max_retries(mut self, n: u32) -> Self {
        self.inner.max_retries = n;
        self
    }

    /// Set the first-retry backoff.
    #[must_use]
    pub fn initial_backoff(mut self, d: Duration) -> Self {
        self.inner.initial_backoff = d;
        self
    }

    /// Set the backoff ceiling.
    #[must_use]
    pub fn max_backoff(mut self, d: Duration) -> Self {
        self.inner.max_backoff = d;
        self
    }

    /// Set the per-attempt multiplier.
    #[must_use]
    pub fn backoff_multiplier(mut self, m: f64) -> Self {
        self.inner.backoff_multiplier = m;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        self.inner
    }
}

/// Per-operation timeout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Overall deadline for the operation, if bounded.
    pub overall_timeout: Option<Duration>,
    /// Per-attempt timeout (spec §4.2: default 30s per HTTP attempt).
    pub attempt_timeout: Option<Duration>,
}
