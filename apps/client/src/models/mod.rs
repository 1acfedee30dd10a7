pub mod analysis;
pub mod session;
pub mod upload;

use serde_json::Value;

/// Identifiers arrive as strings or bare numbers; both address the same record.
pub fn record_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
