//! LinkedIn MCP Server Library
//!
//! Exposes LinkedIn profile, company and job lookups to AI assistants over
//! the Model Context Protocol.
//!
//! # Tools
//!
//! - `get_person_profile` - Profile details for a `linkedin.com/in/<id>` URL
//! - `get_company_profile` - Company details for a `linkedin.com/company/<name>` URL
//! - `get_job_details` - A job posting by URL or id
//! - `search_jobs` - Job search by keywords and location
//! - `get_recommended_jobs` - Recommendations for the signed-in member
//! - `close_session` - Release the LinkedIn session
//!
//! Tool calls share a single LinkedIn session owned by
//! [`linkedin_core::SessionManager`]; `initialize` and `tools/list` never
//! touch it.

pub mod config;
pub mod handlers;
pub mod health;
pub mod invariants;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use config::{Args, ServerConfig, Transport};
pub use handlers::{dispatch, dispatch_raw, Outcome, ServerState};
pub use protocol::*;
pub use server::{run_http, run_stdio, serve_lines};
pub use tools::ToolRegistry;
