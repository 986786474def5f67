//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the Godot project checks as MCP tools. The server
//! speaks JSON-RPC 2.0 over a newline-delimited stdio transport: stdin
//! carries client messages, stdout carries responses, stderr is reserved
//! for logging.
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;
