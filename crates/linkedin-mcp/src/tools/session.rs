//! Session teardown tool

use serde_json::json;

use crate::protocol::{Tool, ToolAnnotations};

pub const NAME: &str = "close_session";

pub fn tool_definition() -> Tool {
    Tool {
        name: NAME.to_string(),
        title: Some("Close Session".to_string()),
        description: "Close browser session and clean up resources".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(false),
        }),
    }
}

/// Result payload for a completed teardown
pub fn closed(released: bool) -> serde_json::Value {
    let message = if released {
        "Successfully closed the LinkedIn session and cleaned up resources"
    } else {
        "No active LinkedIn session to close"
    };
    json!({
        "status": "success",
        "released": released,
        "message": message,
    })
}
