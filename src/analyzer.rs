//! The analysis pipeline: intake → compose → complete → decode.
//!
//! An [`Analyzer`] is built once at startup and shared by every request.
//! It holds no per-request state, so concurrent calls need no locking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::backend::{CompletionBackend, CompletionRequest, LlmConfig};
use crate::decoder::{DecodeMode, ResponseDecoder};
use crate::error::{AnalyzerError, Result};
use crate::intake;
use crate::profile::AnalysisProfile;
use crate::prompt::PromptComposer;
use crate::types::{AnalysisRequest, AnalysisResult};

/// Model identifier used unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Upper bound on a single backend call unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs one analysis per call against a fixed profile and backend.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tone_analyzer::{AnalysisProfile, Analyzer, MockBackend};
///
/// let analyzer = Analyzer::builder(Arc::new(MockBackend::fixed("{}")))
///     .profile(AnalysisProfile::Narrative)
///     .model("gpt-4.1-mini")
///     .build();
/// assert_eq!(analyzer.profile(), AnalysisProfile::Narrative);
/// ```
pub struct Analyzer {
    backend: Arc<dyn CompletionBackend>,
    composer: PromptComposer,
    decoder: ResponseDecoder,
    model: String,
    config: LlmConfig,
    timeout: Duration,
}

impl Analyzer {
    /// Create a new builder around a backend.
    pub fn builder(backend: Arc<dyn CompletionBackend>) -> AnalyzerBuilder {
        AnalyzerBuilder {
            backend,
            profile: AnalysisProfile::default(),
            model: None,
            config: None,
            timeout: None,
            decode_mode: DecodeMode::default(),
        }
    }

    pub fn profile(&self) -> AnalysisProfile {
        self.composer.profile()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate a bare text and analyze it.
    pub async fn analyze_text(&self, text: &str) -> Result<AnalysisResult> {
        let request = intake::validate_text(text)?;
        self.analyze(&request).await
    }

    /// Analyze an already-validated request.
    ///
    /// Issues exactly one backend call. Dropping the returned future drops
    /// the in-flight call with it.
    #[tracing::instrument(
        name = "analyze",
        skip_all,
        fields(
            profile = %self.profile(),
            model = %self.model,
            backend = self.backend.name(),
            text_len = request.text().len(),
        )
    )]
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let started = Instant::now();
        let completion_request = CompletionRequest {
            model: self.model.clone(),
            messages: self.composer.compose(request).into_messages(),
            config: self.config.clone(),
        };

        let completion = tokio::time::timeout(
            self.timeout,
            self.backend.complete(&completion_request),
        )
        .await
        .map_err(|_| AnalyzerError::Timeout(self.timeout))??;

        debug!(
            status = completion.status,
            reply_len = completion.text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );

        match self.decoder.decode(&completion.text) {
            Ok(result) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis completed"
                );
                Ok(result)
            }
            Err(e) => {
                debug!(kind = %e.kind(), "Model reply rejected: {}", e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("backend", &self.backend.name())
            .field("profile", &self.profile())
            .field("model", &self.model)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .field("decode_mode", &self.decoder.mode())
            .finish()
    }
}

/// Builder for [`Analyzer`].
pub struct AnalyzerBuilder {
    backend: Arc<dyn CompletionBackend>,
    profile: AnalysisProfile,
    model: Option<String>,
    config: Option<LlmConfig>,
    timeout: Option<Duration>,
    decode_mode: DecodeMode,
}

impl AnalyzerBuilder {
    /// Set the analysis profile. Default: [`AnalysisProfile::Basic`].
    pub fn profile(mut self, profile: AnalysisProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the model identifier. Default: [`DEFAULT_MODEL`].
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set sampling options. JSON mode is always forced on.
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Bound each backend call. Default: [`DEFAULT_TIMEOUT`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Choose how forgiving reply parsing is. Default: [`DecodeMode::Strict`].
    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    pub fn build(self) -> Analyzer {
        Analyzer {
            backend: self.backend,
            composer: PromptComposer::new(self.profile),
            decoder: ResponseDecoder::new(self.profile).with_mode(self.decode_mode),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            config: self.config.unwrap_or_default().with_json_mode(true),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}
