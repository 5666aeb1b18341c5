//! Mock backend for testing without a live LLM.
//!
//! [`MockBackend`] returns pre-configured replies in order and records every
//! request it receives, so tests can assert on call counts and prompt content.
//!
//! # Example
//!
//! ```
//! use tone_analyzer::backend::MockBackend;
//!
//! let mock = MockBackend::fixed(r#"{"emocion_predominante": "alegría"}"#);
//! assert_eq!(mock.calls(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Completion, CompletionBackend, CompletionRequest};
use crate::error::{AnalyzerError, Result};

/// One canned outcome of a mock call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Reply with this text.
    Text(String),
    /// Fail as if the provider answered with this status.
    HttpError { status: u16, body: String },
    /// Succeed at the HTTP level but carry no message content.
    MissingContent,
}

/// A test backend that returns canned replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockBackend {
    /// Create a mock backend with the given canned text replies.
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_replies(responses.into_iter().map(MockReply::Text).collect())
    }

    /// Create a mock backend from arbitrary canned outcomes.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a mock that always returns the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Create a mock whose every call fails with the given HTTP status.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self::with_replies(vec![MockReply::HttpError {
            status,
            body: body.into(),
        }])
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.lock_requests().len()
    }

    /// Snapshot of every request received, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock_requests().clone()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.lock_requests().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(Completion {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::HttpError { status, body } => Err(AnalyzerError::HttpError { status, body }),
            MockReply::MissingContent => Err(AnalyzerError::MissingContent),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
