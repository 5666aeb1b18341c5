//! Request intake: turns an inbound body into an [`AnalysisRequest`].
//!
//! The only rule is that `text` must be a string with something other than
//! whitespace in it. There is no length cap.

use serde_json::Value;

use crate::error::{AnalyzerError, Result};
use crate::types::AnalysisRequest;

/// Validate a raw JSON request body.
pub fn parse_body(body: &[u8]) -> Result<AnalysisRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AnalyzerError::InvalidRequest(format!("body is not valid JSON: {}", e)))?;
    from_value(&value)
}

/// Validate an already-parsed JSON body.
pub fn from_value(value: &Value) -> Result<AnalysisRequest> {
    let object = value.as_object().ok_or_else(|| {
        AnalyzerError::InvalidRequest("body must be a JSON object".to_string())
    })?;

    match object.get("text") {
        None | Some(Value::Null) => Err(AnalyzerError::InvalidRequest(
            "missing 'text' field".to_string(),
        )),
        Some(Value::String(text)) => validate_text(text),
        Some(_) => Err(AnalyzerError::InvalidRequest(
            "'text' must be a string".to_string(),
        )),
    }
}

/// Validate a bare text. The text is kept as given, untrimmed.
pub fn validate_text(text: &str) -> Result<AnalysisRequest> {
    if text.trim().is_empty() {
        return Err(AnalyzerError::InvalidRequest(
            "'text' is empty".to_string(),
        ));
    }
    Ok(AnalysisRequest::new_unchecked(text.to_string()))
}
