// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Cooperative cancellation and deadline propagation (spec §5: "Every
//! operation takes an ambient deadline... Cancellation must not be
//! swallowed — a cancelled operation returns a transient error
//! classification").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// A cloneable, cheaply-shareable token used to signal cancellation.
///
/// All clones share the same underlying state; cancelling one immediately
/// makes every clone observe `is_cancelled() == true`.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new token that is **not** cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(TokenInner { cancelled: AtomicBool::new(false), notify: Notify::new() }) }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// `true` if [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A future that resolves when the token is cancelled. Resolves
    /// immediately if already cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            self.inner.notify.notified().await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken").field("cancelled", &self.is_cancelled()).finish()
    }
}

/// Why an operation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// The envelope's visibility timeout elapsed before the handler finished.
    VisibilityExpired,
    /// The handler's own deadline (spec §4.10: `min(visibility, 5 min)`) elapsed.
    DeadlineExceeded,
    /// The process is shutting down.
    SystemShutdown,
}

/// An absolute deadline derived from an ambient budget (spec §5).
///
/// Construct with [`Deadline::from_now`]; pass [`Deadline::remaining`] to
/// `tokio::time::timeout` at each suspension point (HTTP call, store call,
/// secret fetch, pub/sub call).
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    instant: tokio::time::Instant,
}

impl Deadline {
    /// A deadline `duration` from now.
    #[must_use]
    pub fn from_now(duration: Duration) -> Self {
        Self { instant: tokio::time::Instant::now() + duration }
    }

    /// Spec §4.10/§5: the handler deadline is
    /// `min(envelope visibility remaining, 5 min)`.
    #[must_use]
    pub fn for_handler(visibility_remaining: Duration) -> Self {
        const MAX_HANDLER_DEADLINE: Duration = Duration::from_secs(5 * 60);
        Self::from_now(visibility_remaining.min(MAX_HANDLER_DEADLINE))
    }

    /// Time remaining until the deadline; zero if already past.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.instant.saturating_duration_since(tokio::time::Instant::now())
    }

    /// `true` once `remaining()` would be zero.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        tokio::time::Instant::now() >= self.instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. token lifecycle --------------------------------------------
    #[test]
    fn token_starts_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn clone_shares_state() {
        let a = CancellationToken::new();
        let b = a.clone();
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn multiple_cancels_are_idempotent() {
        let t = CancellationToken::new();
        t.cancel();
        t.cancel();
        assert!(t.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let t = CancellationToken::new();
        let waiter = t.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        t.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_future_resolves_immediately_if_already_cancelled() {
        let t = CancellationToken::new();
        t.cancel();
        tokio::time::timeout(Duration::from_millis(50), t.cancelled()).await.unwrap();
    }

    // -- 2. deadline computation -----------------------------------------
    #[test]
    fn for_handler_caps_at_five_minutes() {
        let d = Deadline::for_handler(Duration::from_secs(10 * 60));
        assert!(d.remaining() <= Duration::from_secs(5 * 60));
        assert!(d.remaining() > Duration::from_secs(4 * 60));
    }

    #[test]
    fn for_handler_respects_shorter_visibility() {
        let d = Deadline::for_handler(Duration::from_secs(30));
        assert!(d.remaining() <= Duration::from_secs(30));
    }

    #[test]
    fn is_expired_false_for_future_deadline() {
        let d = Deadline::from_now(Duration::from_secs(60));
        assert!(!d.is_expired());
    }
}
