//! Person profile tool

use linkedin_core::LinkedInRequest;
use serde_json::{json, Value};

use crate::invariants::{parse_profile_url, ValidationResult};
use crate::protocol::{Tool, ToolAnnotations};

pub const NAME: &str = "get_person_profile";

/// Get the tool definition
pub fn tool_definition() -> Tool {
    Tool {
        name: NAME.to_string(),
        title: Some("Get Person Profile".to_string()),
        description: "Get detailed information from a LinkedIn profile including work history, \
                      education, skills, and connections"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "profile_url": {
                    "type": "string",
                    "minLength": 1,
                    "description": "LinkedIn profile URL, e.g. https://www.linkedin.com/in/<id>/"
                }
            },
            "required": ["profile_url"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::lookup()),
    }
}

/// Reduce validated arguments to a profile lookup
pub fn request(arguments: &Value) -> ValidationResult<LinkedInRequest> {
    let url = arguments["profile_url"].as_str().unwrap_or_default();
    Ok(LinkedInRequest::PersonProfile {
        public_id: parse_profile_url(url)?,
    })
}
