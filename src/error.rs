use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while analyzing a text.
///
/// Variants describe *what* went wrong; [`AnalyzerError::kind`] groups them
/// into the coarse taxonomy the HTTP layer reports on.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The inbound payload has no usable `text` field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Low-level HTTP transport failure (connection refused, DNS, TLS, etc.).
    #[error("HTTP request to completion backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The completion backend answered with a non-success status code.
    ///
    /// Covers rate limiting (429) and authentication failures (401/403) as
    /// well as plain server errors.
    #[error("completion backend returned HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 401, 429, 503).
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The backend call did not resolve within the configured bound.
    #[error("completion backend did not answer within {0:?}")]
    Timeout(Duration),

    /// The backend answered successfully but the reply carried no message content.
    #[error("completion backend returned no message content")]
    MissingContent,

    /// The reply text is not a single JSON object.
    #[error("model reply is not a valid JSON object: {0}")]
    MalformedResponse(String),

    /// The reply is a JSON object but breaks the active profile's contract.
    #[error("model reply violates the analysis schema: {}", join_issues(.0))]
    SchemaViolation(Vec<SchemaIssue>),

    /// Invalid configuration detected at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse error taxonomy exposed to clients and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client input contract violated; no backend call was made.
    InvalidRequest,
    /// Completion service unreachable, erroring, rate-limited or too slow.
    BackendUnavailable,
    /// Reply is not valid JSON.
    MalformedResponse,
    /// Reply is valid JSON but breaks the field/enum contract.
    SchemaViolation,
    /// Anything that is a bug or misconfiguration on our side.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AnalyzerError {
    /// Classify this error into the client-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AnalyzerError::Transport(_)
            | AnalyzerError::HttpError { .. }
            | AnalyzerError::Timeout(_)
            | AnalyzerError::MissingContent => ErrorKind::BackendUnavailable,
            AnalyzerError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            AnalyzerError::SchemaViolation(_) => ErrorKind::SchemaViolation,
            AnalyzerError::InvalidConfig(_) => ErrorKind::Internal,
        }
    }
}

/// A single schema problem found in a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// JSON path of the offending value, e.g. `analisis_detallado[1].polaridad`.
    pub path: String,
    /// What is wrong with it.
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failures_share_a_kind() {
        let errors = [
            AnalyzerError::HttpError {
                status: 429,
                body: "rate limited".into(),
            },
            AnalyzerError::HttpError {
                status: 401,
                body: "bad key".into(),
            },
            AnalyzerError::Timeout(Duration::from_secs(5)),
            AnalyzerError::MissingContent,
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::BackendUnavailable, "{err}");
        }
    }

    #[test]
    fn test_decode_failures_are_distinct() {
        let malformed = AnalyzerError::MalformedResponse("expected value".into());
        let schema = AnalyzerError::SchemaViolation(vec![SchemaIssue::new("x", "missing")]);
        assert_eq!(malformed.kind(), ErrorKind::MalformedResponse);
        assert_eq!(schema.kind(), ErrorKind::SchemaViolation);
        assert_ne!(malformed.kind(), schema.kind());
    }

    #[test]
    fn test_schema_violation_lists_every_issue() {
        let err = AnalyzerError::SchemaViolation(vec![
            SchemaIssue::new("tono_principal", "missing required key"),
            SchemaIssue::new("analisis_detallado[0].polaridad", "unexpected value \"mixta\""),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("tono_principal: missing required key"));
        assert!(msg.contains("analisis_detallado[0].polaridad"));
    }

    #[test]
    fn test_http_error_display_carries_body() {
        let err = AnalyzerError::HttpError {
            status: 401,
            body: "Incorrect API key provided".into(),
        };
        assert_eq!(
            err.to_string(),
            "completion backend returned HTTP 401: Incorrect API key provided"
        );
    }
}
