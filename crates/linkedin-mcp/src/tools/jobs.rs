//! Job tools: details, search and recommendations

use linkedin_core::LinkedInRequest;
use serde_json::{json, Value};

use crate::invariants::{parse_job_url, ValidationResult};
use crate::protocol::{Tool, ToolAnnotations};

pub const DETAILS: &str = "get_job_details";
pub const SEARCH: &str = "search_jobs";
pub const RECOMMENDED: &str = "get_recommended_jobs";

// ============================================================================
// get_job_details
// ============================================================================

pub fn details_definition() -> Tool {
    Tool {
        name: DETAILS.to_string(),
        title: Some("Get Job Details".to_string()),
        description: "Retrieve specific job posting details using LinkedIn job IDs".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "job_url": {
                    "type": "string",
                    "minLength": 1,
                    "description": "LinkedIn job URL (https://www.linkedin.com/jobs/view/<id>/) or job id"
                }
            },
            "required": ["job_url"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::lookup()),
    }
}

pub fn details_request(arguments: &Value) -> ValidationResult<LinkedInRequest> {
    let url = arguments["job_url"].as_str().unwrap_or_default();
    Ok(LinkedInRequest::JobDetails {
        job_id: parse_job_url(url)?,
    })
}

// ============================================================================
// search_jobs
// ============================================================================

pub fn search_definition() -> Tool {
    Tool {
        name: SEARCH.to_string(),
        title: Some("Search Jobs".to_string()),
        description: "Search for jobs with filters like keywords and location".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "string",
                    "description": "Job search keywords"
                },
                "location": {
                    "type": "string",
                    "description": "Job location"
                }
            },
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::lookup()),
    }
}

/// Blank filters are dropped rather than sent as empty query parameters
fn filter(arguments: &Value, key: &str) -> Option<String> {
    arguments[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn search_request(arguments: &Value) -> ValidationResult<LinkedInRequest> {
    Ok(LinkedInRequest::SearchJobs {
        keywords: filter(arguments, "keywords"),
        location: filter(arguments, "location"),
    })
}

// ============================================================================
// get_recommended_jobs
// ============================================================================

pub fn recommended_definition() -> Tool {
    Tool {
        name: RECOMMENDED.to_string(),
        title: Some("Get Recommended Jobs".to_string()),
        description: "Get personalized job recommendations based on your profile".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::lookup()),
    }
}

pub fn recommended_request(_arguments: &Value) -> ValidationResult<LinkedInRequest> {
    Ok(LinkedInRequest::RecommendedJobs)
}
