//! MCP transports
//!
//! Newline-delimited JSON over stdio for local clients, and a streamable
//! HTTP endpoint for hosted deployments.

pub mod http;
pub mod stdio;

pub use http::build_router;
pub use stdio::{LineReader, LineWriter};
