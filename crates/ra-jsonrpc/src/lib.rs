//! Transport-independent JSON-RPC 2.0 engine (spec §4.11).
//!
//! Requests are dispatched by method name to a registered async handler.
//! Responses and errors follow the JSON-RPC 2.0 envelope shape; error codes
//! include the JSON-RPC reserved range plus the MCP-reserved codes this core
//! binds (`-32001`, `-32002`, `-32004`).
//!
//! Deviation from the spec (documented, not a bug): every request currently
//! receives a response, including those with a missing or `null` `id`
//! (JSON-RPC notifications). Batch requests are not implemented.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ra_error::{ErrorKind, RezError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// `-32700` Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;
/// `-32600` The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// `-32601` The requested method does not exist or is not registered.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// `-32602` Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;
/// `-32603` Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;
/// `-32001` MCP-reserved: named tool is not registered.
pub const TOOL_NOT_FOUND: i64 = -32001;
/// `-32002` MCP-reserved: tool execution failed.
pub const TOOL_EXECUTION_ERROR: i64 = -32002;
/// `-32004` MCP-reserved: authentication/authorization failure.
pub const AUTH_FAILURE: i64 = -32004;

/// A JSON-RPC 2.0 request object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be exactly `"2.0"`; checked by [`Dispatcher::handle`].
    #[serde(default)]
    pub jsonrpc: String,
    /// Correlates the response to this request. Absent or `null` marks a
    /// notification under the JSON-RPC spec; see the module-level deviation
    /// note.
    #[serde(default)]
    pub id: Option<Value>,
    /// Name of the method to invoke.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Error)]
#[error("jsonrpc error {code}: {message}")]
pub struct JsonRpcError {
    /// Numeric error code (see the module constants).
    pub code: i64,
    /// Human-readable, non-sensitive description.
    pub message: String,
    /// Optional structured detail, e.g. a correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Build an error with no `data` payload.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a correlation id as the error's `data` field.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.data = Some(Value::String(correlation_id.into()));
        self
    }
}

/// Map an internal [`RezError`] to a JSON-RPC error per spec §4.12's
/// propagation rule: the classification and a stable code cross the
/// boundary, never token material, secret values, or raw upstream bodies.
impl From<RezError> for JsonRpcError {
    fn from(err: RezError) -> Self {
        let code = match err.kind() {
            ErrorKind::Validation => INVALID_PARAMS,
            ErrorKind::Unauthorized => AUTH_FAILURE,
            ErrorKind::UpstreamTransient
            | ErrorKind::UpstreamPermanent
            | ErrorKind::Blocked => TOOL_EXECUTION_ERROR,
            ErrorKind::StoreConflict | ErrorKind::StoreUnavailable | ErrorKind::Internal => {
                INTERNAL_ERROR
            }
        };
        let mut e = JsonRpcError::new(code, err.message().to_string());
        if let Some(cid) = err.correlation_id() {
            e = e.with_correlation_id(cid.to_string());
        }
        e
    }
}

/// A JSON-RPC 2.0 response object: exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoes the request's `id`.
    pub id: Option<Value>,
    /// Set on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a success response.
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    #[must_use]
    pub fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A registered JSON-RPC method handler.
///
/// Handlers receive the raw `params` value (absent params surface as
/// `Value::Null`) and return either a result value or a [`JsonRpcError`].
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the method, returning the `result` value on success.
    async fn call(&self, params: Value) -> Result<Value, JsonRpcError>;
}

#[async_trait]
impl<F, Fut> MethodHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value, JsonRpcError>> + Send,
{
    async fn call(&self, params: Value) -> Result<Value, JsonRpcError> {
        (self)(params).await
    }
}

/// Method-name-keyed dispatch table, built once at startup and read-only
/// thereafter (spec §5: "Handler registry & tool registry: built at
/// startup, read-only thereafter; no locking needed").
#[derive(Default, Clone)]
pub struct Dispatcher {
    methods: HashMap<String, Arc<dyn MethodHandler>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a handler under `method`, replacing any prior registration.
    pub fn register(&mut self, method: impl Into<String>, handler: impl MethodHandler + 'static) {
        self.methods.insert(method.into(), Arc::new(handler));
    }

    /// `true` if `method` has a registered handler.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Parse, dispatch, and format a single JSON-RPC call. Never panics on
    /// malformed input; parse/shape failures become `-32700`/`-32600`
    /// responses rather than propagated errors.
    ///
    /// `-32700` is reserved for JSON that fails to parse at all. A
    /// well-formed top-level JSON array is a batch request; batching is not
    /// implemented (spec §9 Q3), so it is rejected as `-32600` rather than
    /// fed to the single-request deserializer, which would otherwise also
    /// report it as a parse error.
    pub async fn handle(&self, raw: &str) -> JsonRpcResponse {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                return JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(PARSE_ERROR, format!("invalid JSON: {e}")),
                );
            }
        };
        if value.is_array() {
            return JsonRpcResponse::failure(
                None,
                JsonRpcError::new(INVALID_REQUEST, "batch requests are not supported"),
            );
        }
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                return JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(INVALID_REQUEST, format!("invalid request object: {e}")),
                );
            }
        };
        self.dispatch(request).await
    }

    /// Dispatch an already-parsed request. `id: null`/missing is treated as
    /// a notification per JSON-RPC 2.0, but this engine currently responds
    /// to every request regardless (documented deviation, spec §9 Q2).
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::failure(
                request.id,
                JsonRpcError::new(INVALID_REQUEST, "jsonrpc version must be \"2.0\""),
            );
        }
        let Some(handler) = self.methods.get(&request.method) else {
            return JsonRpcResponse::failure(
                request.id,
                JsonRpcError::new(
                    METHOD_NOT_FOUND,
                    format!("method not found: {}", request.method),
                ),
            );
        };
        let params = request.params.unwrap_or(Value::Null);
        match handler.call(params).await {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::failure(request.id, error),
        }
    }
}
