//! godot-check-mcp: MCP server for Godot project quality checks
//!
//! This library exposes GDScript lint, format, export validation and engine
//! log inspection as MCP tools, backed by the external `gdlint`, `gdformat`
//! and `godot` binaries.
//!
//! # Architecture
//!
//! The MCP server is a thin orchestration layer. The external tools do the
//! real work:
//!
//! - **Path validation**: every path argument must be absolute and existing
//! - **Project scanning**: recursive `.gd` discovery with a fixed ignore set
//! - **Tool invocation**: one child process per check, captured and classified
//! - **Result shaping**: every tool call returns a JSON object with `success`
//!
//! The server never interprets GDScript itself; it only aggregates what the
//! tools report.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Configuration error types
//! - [`godot`] — Project checks (scan, exec, tool handlers)
//! - [`mcp`] — MCP protocol implementation

pub mod config;
pub mod error;
pub mod godot;
pub mod mcp;
