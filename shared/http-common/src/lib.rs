//! Shared HTTP utilities for the user administration service.
//!
//! Framework-agnostic response builders and time helpers; the api-server turns
//! these into actual HTTP responses.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::SystemTime;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Wrapper around every successful (non-204) response body.
///
/// Serializes as `{"success": true, "data": <data>, "timestamp": "<rfc3339>"}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

/// Wrap `data` in a success envelope stamped with the current time.
pub fn envelope<T: Serialize>(data: T) -> Envelope<T> {
    Envelope {
        success: true,
        data,
        timestamp: now_rfc3339(),
    }
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Error counterpart of [`Envelope`]:
/// `{"success": false, "error": {"code", "message"}, "timestamp": "<rfc3339>"}`.
pub fn error_envelope(code: &str, message: &str) -> serde_json::Value {
    let mut body = json_error_with_message(code, message);
    body["success"] = serde_json::Value::Bool(false);
    body["timestamp"] = serde_json::Value::String(now_rfc3339());
    body
}

/// HTTP status for an error code used in response bodies.
pub fn status_for_error_code(code: &str) -> u16 {
    match code {
        "invalid_request" | "bad_request" => 400,
        "not_found" => 404,
        "conflict" => 409,
        _ => 500,
    }
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (millisecond precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as an RFC3339 string.
pub fn now_rfc3339() -> String {
    system_time_to_rfc3339(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_json_error_with_message() {
        let message = "Profile with name \"Admin\" already exists";
        let err = json_error_with_message("conflict", message);
        assert_eq!(
            err,
            serde_json::json!({"error": {"code": "conflict", "message": message}})
        );
    }

    #[test]
    fn test_error_envelope() {
        let body = error_envelope("not_found", "User with ID 7 not found");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "User with ID 7 not found");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_envelope_serialization() {
        let v = serde_json::to_value(envelope(vec![1, 2])).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"], serde_json::json!([1, 2]));
        assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_status_for_error_code() {
        assert_eq!(status_for_error_code("invalid_request"), 400);
        assert_eq!(status_for_error_code("not_found"), 404);
        assert_eq!(status_for_error_code("conflict"), 409);
        assert_eq!(status_for_error_code("internal"), 500);
        assert_eq!(status_for_error_code("whatever"), 500);
    }

    #[test]
    fn test_system_time_to_rfc3339() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(system_time_to_rfc3339(t), "1970-01-01T00:00:01.500Z");
    }
}
