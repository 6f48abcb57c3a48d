//! Company profile tool

use linkedin_core::LinkedInRequest;
use serde_json::{json, Value};

use crate::invariants::{parse_company_url, ValidationResult};
use crate::protocol::{Tool, ToolAnnotations};

pub const NAME: &str = "get_company_profile";

pub fn tool_definition() -> Tool {
    Tool {
        name: NAME.to_string(),
        title: Some("Get Company Profile".to_string()),
        description: "Extract comprehensive company information from a LinkedIn company profile"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "company_url": {
                    "type": "string",
                    "minLength": 1,
                    "description": "LinkedIn company URL, e.g. https://www.linkedin.com/company/<name>/"
                }
            },
            "required": ["company_url"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::lookup()),
    }
}

pub fn request(arguments: &Value) -> ValidationResult<LinkedInRequest> {
    let url = arguments["company_url"].as_str().unwrap_or_default();
    Ok(LinkedInRequest::CompanyProfile {
        universal_name: parse_company_url(url)?,
    })
}
