// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! MCP (Model Context Protocol) tool server (spec §4.12).
//!
//! Binds `initialize`/`tools/list`/`tools/call`/`ping` over [`ra_jsonrpc`]
//! to the five tools in spec §6, each of which constructs a
//! `WebActionPayload` and runs it through the same [`ra_handlers::HandlerRegistry`]
//! the queue-driven worker uses (spec §4.10), so MCP and queue execution
//! paths are semantically identical.

mod schema;
mod server;
mod tools;

pub use schema::{Format, InputSchema, PropertySchema, PropertyType, ToolDescriptor};
pub use server::McpServer;
pub use tools::{build_payload, handler_action_for, tool_descriptors};
