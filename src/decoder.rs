//! Response decoding: raw model text → validated [`AnalysisResult`].
//!
//! Two stages, two distinct failures:
//! 1. the reply must be a single JSON object ([`AnalyzerError::MalformedResponse`]);
//! 2. the object must carry the profile's required keys with the right
//!    shapes and enumerated values ([`AnalyzerError::SchemaViolation`]).
//!
//! Key order and duplication between fields are left to the prompt; the
//! decoder never checks them and never rewrites the object.

use serde_json::{Map, Value};

use crate::error::{AnalyzerError, Result, SchemaIssue};
use crate::profile::{AnalysisProfile, FieldSpec, FieldType};
use crate::types::AnalysisResult;

/// How forgiving the JSON stage is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// The trimmed reply must be exactly one JSON object.
    #[default]
    Strict,
    /// Like `Strict`, but a reply wrapped in a single markdown code fence is unwrapped first.
    Lenient,
}

/// Decodes replies for one fixed profile.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDecoder {
    profile: AnalysisProfile,
    mode: DecodeMode,
}

impl ResponseDecoder {
    pub fn new(profile: AnalysisProfile) -> Self {
        Self {
            profile,
            mode: DecodeMode::Strict,
        }
    }

    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn profile(&self) -> AnalysisProfile {
        self.profile
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Parse and validate a raw reply.
    pub fn decode(&self, raw: &str) -> Result<AnalysisResult> {
        let object = parse_object(raw, self.mode)?;
        let issues = validate(&object, self.profile);
        if !issues.is_empty() {
            return Err(AnalyzerError::SchemaViolation(issues));
        }
        Ok(AnalysisResult::new(object, self.profile))
    }
}

/// Parse a reply as a single JSON object.
pub fn parse_object(raw: &str, mode: DecodeMode) -> Result<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AnalyzerError::MalformedResponse(
            "reply is empty".to_string(),
        ));
    }

    let candidate = match mode {
        DecodeMode::Strict => trimmed,
        DecodeMode::Lenient => strip_code_fence(trimmed).unwrap_or(trimmed),
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(AnalyzerError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
        Err(e) => Err(AnalyzerError::MalformedResponse(e.to_string())),
    }
}

/// Unwrap text that is entirely one fenced code block (`` ```json ... ``` ``).
fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let body = rest.strip_suffix("```")?;
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let (first_line, content) = body.split_once('\n')?;
    if first_line.trim().chars().any(|c| !c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(content.trim())
}

/// Check an object against a profile. Returns every problem found.
pub fn validate(object: &Map<String, Value>, profile: AnalysisProfile) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    check_fields(object, &profile.fields(), "", &mut issues);
    issues
}

fn check_fields(
    object: &Map<String, Value>,
    fields: &[FieldSpec],
    prefix: &str,
    issues: &mut Vec<SchemaIssue>,
) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.key.to_string()
        } else {
            format!("{}.{}", prefix, field.key)
        };
        match object.get(field.key) {
            Some(value) => check_value(value, &field.ty, &path, issues),
            None => issues.push(SchemaIssue::new(path, "missing required key")),
        }
    }
}

fn check_value(value: &Value, ty: &FieldType, path: &str, issues: &mut Vec<SchemaIssue>) {
    match ty {
        FieldType::Text => {
            if !value.is_string() {
                issues.push(expected(path, "a string", value));
            }
        }
        FieldType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => issues.push(SchemaIssue::new(
                path,
                format!("unexpected value \"{}\" (allowed: {})", s, allowed.join(", ")),
            )),
            None => issues.push(expected(path, "a string", value)),
        },
        FieldType::TextList { .. } => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        issues.push(expected(&format!("{}[{}]", path, i), "a string", item));
                    }
                }
            }
            None => issues.push(expected(path, "an array", value)),
        },
        FieldType::ObjectList(fields) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    match item.as_object() {
                        Some(object) => check_fields(object, fields, &item_path, issues),
                        None => issues.push(expected(&item_path, "an object", item)),
                    }
                }
            }
            None => issues.push(expected(path, "an array", value)),
        },
        FieldType::Object(fields) => match value.as_object() {
            Some(object) => check_fields(object, fields, path, issues),
            None => issues.push(expected(path, "an object", value)),
        },
    }
}

fn expected(path: &str, what: &str, found: &Value) -> SchemaIssue {
    SchemaIssue::new(path, format!("expected {}, got {}", what, type_name(found)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
