// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Action handler registry (spec §4.7) plus the `weather` and `golf`
//! handlers bound to it (spec §4.8, §4.9).
//!
//! An [`ActionHandler`] returns zero or more human-readable text chunks; it
//! never touches the directive/result repository itself — that is the
//! worker's job (spec §4.10 step 8). The same registry backs both the
//! queue-driven worker and the MCP tool server (spec §4.12), so the two
//! execution paths are semantically identical.

mod golf;
mod notify;
mod weather;

pub use golf::GolfHandler;
pub use notify::NotifyHandler;
pub use weather::{WeatherHandler, WEATHER_API_HOST};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ra_cancel::{CancellationToken, Deadline};
use ra_catalog::Catalog;
use ra_core::payload::WebActionPayload;
use ra_error::RezError;
use ra_http::HttpClient;
use ra_oauth::OAuthClient;

/// Everything a handler needs beyond the payload itself: the shared HTTP
/// client, OAuth client, course catalog, and this invocation's deadline and
/// cancellation token (spec §5: "every operation takes an ambient budget").
pub struct HandlerContext {
    /// SSRF-hardened HTTP client, shared across handlers.
    pub http: Arc<HttpClient>,
    /// OAuth client with its own token cache.
    pub oauth: Arc<OAuthClient>,
    /// Course catalog, for endpoint/origin resolution.
    pub catalog: Arc<Catalog>,
    /// Deadline this invocation must respect (spec §4.10: `min(visibility, 5 min)`).
    pub deadline: Deadline,
    /// Cancellation token signaled on shutdown or deadline expiry.
    pub cancel: CancellationToken,
}

/// One web-action implementation (spec §4.7).
///
/// Returns a list of human-readable text chunks; the first becomes
/// `Result.transformed_result`, the joined whole the `response_body`
/// fallback. Handler errors use [`ra_error::ErrorKind`] to signal
/// permanent vs. transient classification to the worker.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute this handler for `payload` under `ctx`.
    ///
    /// # Errors
    /// Returns a [`RezError`] classified permanent or transient per spec §4.10.
    async fn execute(&self, ctx: &HandlerContext, payload: &WebActionPayload) -> Result<Vec<String>, RezError>;
}

/// A typed registry of named [`ActionHandler`] implementations (spec §4.7),
/// shared by the worker and the MCP tool server.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the given action name, replacing any
    /// previous entry.
    pub fn register(&mut self, name: impl Into<String>, handler: impl ActionHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Look up a handler by action name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ActionHandler> {
        self.handlers.get(name).map(|h| &**h)
    }

    /// Return an `Arc` handle to the named handler.
    #[must_use]
    pub fn get_arc(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Sorted list of registered action names.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }

    /// Check whether an action name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ActionHandler for Echo {
        async fn execute(&self, _ctx: &HandlerContext, _payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
            Ok(vec!["ok".to_string()])
        }
    }

    // -- 1. register then get round-trips ------------------------------------
    #[test]
    fn register_then_get_round_trips() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", Echo);
        assert!(registry.get("echo").is_some());
        assert!(registry.contains("echo"));
    }

    // -- 2. unknown action names are absent -----------------------------------
    #[test]
    fn unknown_action_is_absent() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("nope").is_none());
        assert!(!registry.contains("nope"));
    }

    // -- 3. list is sorted -----------------------------------------------------
    #[test]
    fn list_is_sorted() {
        let mut registry = HandlerRegistry::new();
        registry.register("weather", Echo);
        registry.register("golf", Echo);
        assert_eq!(registry.list(), vec!["golf", "weather"]);
    }

    // -- 4. re-registering the same name replaces the handler -----------------
    #[test]
    fn reregister_replaces() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", Echo);
        registry.register("echo", Echo);
        assert_eq!(registry.list().len(), 1);
    }
}
