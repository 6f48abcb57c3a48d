//! Invariants and validation for the LinkedIn MCP server
//!
//! This module contains envelope checks, tool argument validation against
//! the advertised input schemas, and LinkedIn URL parsing.

use serde_json::{Map, Value};

use crate::protocol::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, RequestId};

/// Validation result
pub type ValidationResult<T> = Result<T, JsonRpcError>;

// ============================================================================
// Protocol Invariants
// ============================================================================

/// A validated inbound JSON-RPC message
#[derive(Debug, Clone)]
pub enum Envelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// A response object sent by the client; never answered
    Response,
}

/// Envelope rejection, carrying the id to echo when one could be read
#[derive(Debug, Clone)]
pub struct EnvelopeError {
    pub id: RequestId,
    pub error: JsonRpcError,
}

/// Validate that a JSON-RPC request is well-formed
pub fn validate_request(request: &JsonRpcRequest) -> ValidationResult<()> {
    // Invariant: JSON-RPC version must be "2.0"
    if request.jsonrpc != "2.0" {
        return Err(JsonRpcError::invalid_request("jsonrpc must be \"2.0\""));
    }

    // Invariant: Method must not be empty
    if request.method.is_empty() {
        return Err(JsonRpcError::invalid_request("method must not be empty"));
    }

    // Invariant: Method must not start with "rpc." (reserved)
    if request.method.starts_with("rpc.") {
        return Err(JsonRpcError::invalid_request(
            "methods starting with \"rpc.\" are reserved",
        ));
    }

    Ok(())
}

/// Validate request ID is not null for requests (notifications are different)
pub fn validate_request_id(id: &RequestId) -> ValidationResult<()> {
    match id {
        RequestId::Null => Err(JsonRpcError::invalid_request("id must not be null")),
        _ => Ok(()),
    }
}

/// Best-effort id for error responses
fn echo_id(object: &Map<String, Value>) -> RequestId {
    match object.get("id") {
        Some(Value::String(s)) => RequestId::String(s.clone()),
        Some(Value::Number(n)) => n.as_i64().map(RequestId::Number).unwrap_or(RequestId::Null),
        _ => RequestId::Null,
    }
}

/// Classify and validate one element of a request body
pub fn parse_envelope(value: Value) -> Result<Envelope, EnvelopeError> {
    let object = match value {
        Value::Object(object) => object,
        _ => {
            return Err(EnvelopeError {
                id: RequestId::Null,
                error: JsonRpcError::invalid_request("expected a JSON-RPC object"),
            })
        }
    };

    let id = echo_id(&object);
    let reject = |error: JsonRpcError| EnvelopeError {
        id: id.clone(),
        error,
    };

    let jsonrpc = match object.get("jsonrpc") {
        Some(Value::String(v)) => v.clone(),
        Some(_) => return Err(reject(JsonRpcError::invalid_request("jsonrpc must be a string"))),
        None => return Err(reject(JsonRpcError::invalid_request("missing jsonrpc"))),
    };

    let method = match object.get("method") {
        Some(Value::String(m)) => m.clone(),
        Some(_) => return Err(reject(JsonRpcError::invalid_request("method must be a string"))),
        None if object.contains_key("result") || object.contains_key("error") => {
            return Ok(Envelope::Response)
        }
        None => return Err(reject(JsonRpcError::invalid_request("missing method"))),
    };

    // Invariant: params, when given, is structured
    let params = match object.get("params") {
        None | Some(Value::Null) => None,
        Some(p @ Value::Object(_)) | Some(p @ Value::Array(_)) => Some(p.clone()),
        Some(_) => {
            return Err(reject(JsonRpcError::invalid_request(
                "params must be an object or array",
            )))
        }
    };

    let request_id = match object.get("id") {
        None => {
            let notification = JsonRpcNotification {
                jsonrpc,
                method,
                params,
            };
            if notification.jsonrpc != "2.0" || notification.method.is_empty() {
                return Err(reject(JsonRpcError::invalid_request(
                    "malformed notification",
                )));
            }
            return Ok(Envelope::Notification(notification));
        }
        Some(Value::String(s)) => RequestId::String(s.clone()),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => RequestId::Number(n),
            None => return Err(reject(JsonRpcError::invalid_request("id must be an integer"))),
        },
        Some(Value::Null) => RequestId::Null,
        Some(_) => {
            return Err(reject(JsonRpcError::invalid_request(
                "id must be a string or integer",
            )))
        }
    };

    let request = JsonRpcRequest {
        jsonrpc,
        id: request_id,
        method,
        params,
    };
    validate_request_id(&request.id).map_err(&reject)?;
    validate_request(&request).map_err(&reject)?;

    Ok(Envelope::Request(request))
}

// ============================================================================
// Argument Validation
// ============================================================================

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Check tool arguments against the subset of JSON Schema used by the catalog:
/// `type`, `properties`, `required`, `additionalProperties` and `minLength`.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> ValidationResult<()> {
    let arguments = arguments
        .as_object()
        .ok_or_else(|| JsonRpcError::invalid_params("arguments must be an object"))?;

    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !arguments.contains_key(name) {
                return Err(JsonRpcError::invalid_params(format!(
                    "Missing required argument: {}",
                    name
                )));
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (name, value) in arguments {
        let property = match properties.and_then(|p| p.get(name)) {
            Some(property) => property,
            None if closed => {
                return Err(JsonRpcError::invalid_params(format!(
                    "Unexpected argument: {}",
                    name
                )))
            }
            None => continue,
        };

        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !type_matches(expected, value) {
                return Err(JsonRpcError::invalid_params(format!(
                    "Argument {} must be of type {}",
                    name, expected
                )));
            }
        }

        if let (Some(min), Some(s)) = (
            property.get("minLength").and_then(Value::as_u64),
            value.as_str(),
        ) {
            if (s.chars().count() as u64) < min {
                return Err(JsonRpcError::invalid_params(format!(
                    "Argument {} must be at least {} characters",
                    name, min
                )));
            }
        }
    }

    Ok(())
}

// ============================================================================
// LinkedIn URL Parsing
// ============================================================================

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 200
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '%' | '.'))
}

fn is_linkedin_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "linkedin.com" || host.ends_with(".linkedin.com")
}

/// Split a LinkedIn URL into path segments and query string.
///
/// Returns `None` for a bare identifier: no scheme, no `/`, and not a
/// LinkedIn host name. Dots are allowed in bare identifiers (`booking.com`).
fn split_url(raw: &str) -> ValidationResult<Option<(Vec<&str>, Option<&str>)>> {
    let raw = raw.trim();
    let (rest, has_scheme) = match raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
    {
        Some(rest) => (rest, true),
        None => (raw, false),
    };

    let (host, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None if has_scheme || is_linkedin_host(rest) => (rest, ""),
        None => return Ok(None),
    };

    // Invariant: only LinkedIn hosts
    if !is_linkedin_host(host) {
        return Err(JsonRpcError::invalid_params(format!(
            "Not a LinkedIn URL: {}",
            raw
        )));
    }

    let path = path.split('#').next().unwrap_or_default();
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    let segments = path.split('/').filter(|s| !s.is_empty()).collect();
    Ok(Some((segments, query)))
}

/// Extract the public profile id from `linkedin.com/in/<id>` or a bare id
pub fn parse_profile_url(raw: &str) -> ValidationResult<String> {
    match split_url(raw)? {
        None if is_identifier(raw.trim()) => Ok(raw.trim().to_string()),
        Some((segments, _)) => match segments.as_slice() {
            ["in", id, ..] if is_identifier(id) => Ok(id.to_string()),
            _ => Err(JsonRpcError::invalid_params(format!(
                "Expected a profile URL like https://www.linkedin.com/in/<id>/, got {}",
                raw
            ))),
        },
        None => Err(JsonRpcError::invalid_params(format!(
            "Invalid profile identifier: {}",
            raw
        ))),
    }
}

/// Extract the company universal name from `linkedin.com/company/<name>` or a bare name
pub fn parse_company_url(raw: &str) -> ValidationResult<String> {
    match split_url(raw)? {
        None if is_identifier(raw.trim()) => Ok(raw.trim().to_string()),
        Some((segments, _)) => match segments.as_slice() {
            ["company", name, ..] if is_identifier(name) => Ok(name.to_string()),
            _ => Err(JsonRpcError::invalid_params(format!(
                "Expected a company URL like https://www.linkedin.com/company/<name>/, got {}",
                raw
            ))),
        },
        None => Err(JsonRpcError::invalid_params(format!(
            "Invalid company identifier: {}",
            raw
        ))),
    }
}

fn job_id_from(candidate: &str) -> Option<String> {
    // Slugged job URLs end with the numeric id
    let id = candidate.rsplit('-').next().unwrap_or(candidate);
    (!id.is_empty() && id.len() <= 20 && id.chars().all(|c| c.is_ascii_digit()))
        .then(|| id.to_string())
}

/// Extract the numeric job id from `/jobs/view/<id>`, a `currentJobId`
/// query parameter, or a bare id
pub fn parse_job_url(raw: &str) -> ValidationResult<String> {
    let invalid = || {
        JsonRpcError::invalid_params(format!(
            "Expected a job URL like https://www.linkedin.com/jobs/view/<id>/ or a job id, got {}",
            raw
        ))
    };

    match split_url(raw)? {
        None => job_id_from(raw.trim())
            .filter(|id| id == raw.trim())
            .ok_or_else(invalid),
        Some((segments, query)) => {
            if let ["jobs", "view", slug, ..] = segments.as_slice() {
                return job_id_from(slug).ok_or_else(invalid);
            }
            query
                .into_iter()
                .flat_map(|q| q.split('&'))
                .find_map(|pair| pair.strip_prefix("currentJobId="))
                .and_then(job_id_from)
                .ok_or_else(invalid)
        }
    }
}
