//! Binds `initialize`/`tools/list`/`tools/call`/`ping` over the JSON-RPC
//! engine (spec §4.12).

use std::sync::Arc;
use std::time::Duration;

use ra_cancel::{CancellationToken, Deadline};
use ra_catalog::Catalog;
use ra_core::stage::Stage;
use ra_handlers::{HandlerContext, HandlerRegistry};
use ra_http::HttpClient;
use ra_jsonrpc::{Dispatcher, JsonRpcError, TOOL_EXECUTION_ERROR, TOOL_NOT_FOUND};
use ra_oauth::OAuthClient;
use serde_json::Value;
use tracing::{info, warn};

use crate::schema::InputSchema;
use crate::tools::{build_payload, handler_action_for, tool_descriptors};

/// All five tools execute inline within this budget (spec §4.12:
/// "Synchronous vs asynchronous... In this core, all five tools execute
/// inline"), so the deadline is a flat per-call ceiling rather than derived
/// from an envelope's visibility timeout.
const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// `{protocolVersion, capabilities, clientInfo}` accepted by `initialize`;
/// fields beyond `protocolVersion` are accepted and ignored.
const NEGOTIATED_PROTOCOL_VERSION: &str = "2024-11-05";

/// The MCP tool server (spec §4.12), sharing the [`HandlerRegistry`] with
/// the queue-driven worker so both execution paths are semantically
/// identical.
pub struct McpServer {
    handlers: Arc<HandlerRegistry>,
    http: Arc<HttpClient>,
    oauth: Arc<OAuthClient>,
    catalog: Arc<Catalog>,
    stage: Stage,
    notifier_url: String,
    server_name: String,
    server_version: String,
}

impl McpServer {
    /// Build a server over the given shared dependencies.
    #[must_use]
    pub fn new(
        handlers: Arc<HandlerRegistry>,
        http: Arc<HttpClient>,
        oauth: Arc<OAuthClient>,
        catalog: Arc<Catalog>,
        stage: Stage,
        notifier_url: impl Into<String>,
        server_name: impl Into<String>,
        server_version: impl Into<String>,
    ) -> Self {
        Self {
            handlers,
            http,
            oauth,
            catalog,
            stage,
            notifier_url: notifier_url.into(),
            server_name: server_name.into(),
            server_version: server_version.into(),
        }
    }

    /// Register `initialize`/`tools/list`/`tools/call`/`ping` on `dispatcher`.
    pub fn register_methods(self: &Arc<Self>, dispatcher: &mut Dispatcher) {
        let server = self.clone();
        dispatcher.register("initialize", move |_params: Value| {
            let server = server.clone();
            async move { Ok(server.initialize()) }
        });

        let server = self.clone();
        dispatcher.register("tools/list", move |_params: Value| {
            let server = server.clone();
            async move { Ok(server.tools_list()) }
        });

        let server = self.clone();
        dispatcher.register("tools/call", move |params: Value| {
            let server = server.clone();
            async move { server.tools_call(params).await }
        });

        dispatcher.register("ping", |_params: Value| async move { Ok(serde_json::json!({})) });
    }

    fn initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": NEGOTIATED_PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.server_name, "version": self.server_version },
        })
    }

    fn tools_list(&self) -> Value {
        let tools: Vec<Value> = tool_descriptors().iter().map(crate::schema::ToolDescriptor::to_json).collect();
        serde_json::json!({ "tools": tools })
    }

    async fn tools_call(&self, params: Value) -> Result<Value, JsonRpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(ra_jsonrpc::INVALID_PARAMS, "params.name is required"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Object(serde_json::Map::new()));

        let descriptors = tool_descriptors();
        let descriptor = descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| JsonRpcError::new(TOOL_NOT_FOUND, format!("unknown tool '{name}'")))?;

        validate_arguments(&descriptor.input_schema, &arguments)?;

        let payload =
            build_payload(name, &arguments, &self.catalog, self.stage, &self.notifier_url).map_err(JsonRpcError::from)?;

        let action_name = handler_action_for(name).expect("every descriptor maps to a handler action");
        let handler = self
            .handlers
            .get_arc(action_name)
            .ok_or_else(|| JsonRpcError::new(TOOL_NOT_FOUND, format!("no handler registered for action '{action_name}'")))?;

        let ctx = HandlerContext {
            http: self.http.clone(),
            oauth: self.oauth.clone(),
            catalog: self.catalog.clone(),
            deadline: Deadline::from_now(TOOL_CALL_TIMEOUT),
            cancel: CancellationToken::new(),
        };

        info!(tool = name, "tools/call");
        match handler.execute(&ctx, &payload).await {
            Ok(chunks) => Ok(wrap_content(chunks)),
            Err(err) => {
                warn!(tool = name, kind = %err.kind(), "tool execution failed");
                Err(JsonRpcError::new(TOOL_EXECUTION_ERROR, err.message().to_string()))
            }
        }
    }
}

fn validate_arguments(schema: &InputSchema, arguments: &Value) -> Result<(), JsonRpcError> {
    schema.validate(arguments).map_err(|e| JsonRpcError::new(ra_jsonrpc::INVALID_PARAMS, e.message().to_string()))
}

fn wrap_content(chunks: Vec<String>) -> Value {
    let content: Vec<Value> = chunks.into_iter().map(|text| serde_json::json!({ "type": "text", "text": text })).collect();
    serde_json::json!({ "content": content })
}
