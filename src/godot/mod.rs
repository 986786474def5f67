//! Godot project checks.
//!
//! This module holds the domain logic behind the MCP tools: path
//! validation, project scanning, external tool invocation and the
//! per-operation handlers that shape results.
//!
//! All paths crossing this boundary must be absolute; validation never
//! consults the process working directory. External tools are invoked
//! directly (no shell) with captured, bounded output.

pub mod error;
pub mod exec;
pub mod paths;
pub mod scan;
pub mod tools;

pub use error::{CheckError, CheckResult};
