//! LinkedIn MCP tool registry
//!
//! The catalog is fixed at startup. Each entry pairs its descriptor with a
//! binding: either a conversion into a [`LinkedInRequest`] executed against
//! a `Ready` session, or a resource-free handler that never acquires one.

mod company;
mod jobs;
mod person;
mod session;

use std::time::Duration;

use linkedin_core::{LinkedInError, LinkedInRequest, SessionManager};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::invariants::{validate_arguments, ValidationResult};
use crate::protocol::{JsonRpcError, Tool, ToolsCallResult};

/// Converts schema-checked arguments into a resource operation
pub type RequestBuilder = fn(&Value) -> ValidationResult<LinkedInRequest>;

/// How a tool is executed
#[derive(Clone, Copy)]
pub enum ToolBinding {
    /// Needs a `Ready` session
    Session(RequestBuilder),
    /// Tears down the session without acquiring one
    CloseSession,
}

impl ToolBinding {
    pub fn requires_session(&self) -> bool {
        matches!(self, ToolBinding::Session(_))
    }
}

/// A catalog entry
pub struct RegisteredTool {
    pub descriptor: Tool,
    pub binding: ToolBinding,
}

/// Immutable tool catalog
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::linkedin()
    }
}

impl ToolRegistry {
    /// The six LinkedIn tools
    pub fn linkedin() -> Self {
        let tools = vec![
            RegisteredTool {
                descriptor: person::tool_definition(),
                binding: ToolBinding::Session(person::request),
            },
            RegisteredTool {
                descriptor: company::tool_definition(),
                binding: ToolBinding::Session(company::request),
            },
            RegisteredTool {
                descriptor: jobs::details_definition(),
                binding: ToolBinding::Session(jobs::details_request),
            },
            RegisteredTool {
                descriptor: jobs::search_definition(),
                binding: ToolBinding::Session(jobs::search_request),
            },
            RegisteredTool {
                descriptor: jobs::recommended_definition(),
                binding: ToolBinding::Session(jobs::recommended_request),
            },
            RegisteredTool {
                descriptor: session::tool_definition(),
                binding: ToolBinding::CloseSession,
            },
        ];
        Self { tools }
    }

    /// Descriptors in catalog order
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    /// Validate and run one `tools/call`.
    ///
    /// Arguments are checked before any session interaction, and the handler
    /// runs at most once. `budget` bounds acquisition plus execution.
    pub async fn call(
        &self,
        sessions: &SessionManager,
        name: &str,
        arguments: Value,
        budget: Duration,
    ) -> Result<ToolsCallResult, JsonRpcError> {
        let tool = self
            .get(name)
            .ok_or_else(|| JsonRpcError::unknown_tool(name))?;

        validate_arguments(&tool.descriptor.input_schema, &arguments)?;

        match tool.binding {
            ToolBinding::CloseSession => {
                let released = sessions.invalidate().await.map_err(|e| JsonRpcError::from(&e))?;
                info!(tool = name, released, "Session closed on request");
                Ok(ToolsCallResult::structured(session::closed(released)))
            }
            ToolBinding::Session(build) => {
                let request = build(&arguments)?;
                debug!(tool = name, operation = request.operation(), "Dispatching tool");

                match tokio::time::timeout(budget, run(sessions, &request)).await {
                    Ok(Ok(value)) => Ok(ToolsCallResult::structured(value)),
                    Ok(Err(e)) => {
                        warn!(tool = name, kind = e.kind(), error = %e, "Tool failed");
                        Err(JsonRpcError::from(&e))
                    }
                    Err(_) => {
                        warn!(tool = name, budget_secs = budget.as_secs(), "Tool call timed out");
                        Err(JsonRpcError::from(&LinkedInError::Timeout(budget)))
                    }
                }
            }
        }
    }
}

async fn run(sessions: &SessionManager, request: &LinkedInRequest) -> linkedin_core::Result<Value> {
    let session = sessions.acquire().await?;
    match session.execute(request).await {
        Ok(value) => Ok(value),
        Err(e) => {
            if e.invalidates_session() {
                sessions.mark_invalid(&session, &e).await;
            }
            Err(e)
        }
    }
}
