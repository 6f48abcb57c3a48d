#![no_main]

use libfuzzer_sys::fuzz_target;
use linkedin_mcp::invariants::{parse_envelope, validate_arguments, Envelope};
use linkedin_mcp::ToolRegistry;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let messages = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    let registry = ToolRegistry::linkedin();
    for message in messages {
        match parse_envelope(message) {
            Ok(Envelope::Request(request)) => {
                assert_eq!(request.jsonrpc, "2.0");
                assert!(!request.method.is_empty());

                // Argument validation must never panic on arbitrary input
                if let Some(arguments) = request.params.as_ref().and_then(|p| p.get("arguments")) {
                    for tool in registry.definitions() {
                        let _ = validate_arguments(&tool.input_schema, arguments);
                    }
                }
            }
            Ok(Envelope::Notification(notification)) => {
                assert!(!notification.method.is_empty());
            }
            Ok(Envelope::Response) => {}
            Err(rejected) => {
                assert_eq!(rejected.error.code, -32600);
            }
        }
    }
});
