//! Traffic logging for upstream model calls
//!
//! Bodies are truncated: requests carry inline base64 images and user text
//! that must not end up in logs in full.

use tracing::{debug, warn};

/// Maximum characters to log for a serialized body
const MAX_CONTENT_LOG_CHARS: usize = 200;

/// Truncate a string for logging, adding ellipsis if truncated
fn truncate_for_log(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}... ({} chars total)", truncated, char_count)
    }
}

pub fn log_request(model: &str, request: &impl serde::Serialize) {
    let json = serde_json::to_string(request).unwrap_or_else(|_| "<serialization error>".to_string());
    debug!(target: "traffic", model, "REQUEST {}", truncate_for_log(&json, MAX_CONTENT_LOG_CHARS));
}

pub fn log_response(model: &str, status: u16, body: &str) {
    debug!(target: "traffic", model, status, "RESPONSE {}", truncate_for_log(body, MAX_CONTENT_LOG_CHARS));
}

pub fn log_error(model: &str, error: &str) {
    warn!(target: "traffic", model, "ERROR {}", truncate_for_log(error, MAX_CONTENT_LOG_CHARS));
}
