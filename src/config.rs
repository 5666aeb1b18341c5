use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::analyzer::{Analyzer, DEFAULT_MODEL};
use crate::backend::openai::{redact, DEFAULT_BASE_URL};
use crate::backend::{CompletionBackend, OpenAiBackend};
use crate::decoder::DecodeMode;
use crate::error::{AnalyzerError, Result};
use crate::profile::AnalysisProfile;

/// Process configuration, read from flags with environment fallbacks.
#[derive(Parser, Clone)]
#[command(name = "tone-analyzer", version, about)]
pub struct Config {
    /// The port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The address to bind to.
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Credential for the completion backend.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible completion backend.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Model identifier sent with every completion request.
    #[arg(long, env = "ANALYZER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Reply shape requested from the model.
    #[arg(long, env = "ANALYSIS_PROFILE", value_enum, ignore_case = true, default_value_t = AnalysisProfile::Basic)]
    pub profile: AnalysisProfile,

    /// Seconds to wait for the completion backend before giving up.
    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Directory served as static content (`GET /` serves its index.html).
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Accept replies wrapped in a markdown code fence.
    #[arg(long, env = "LENIENT_JSON")]
    pub lenient_json: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind", &self.bind)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("profile", &self.profile)
            .field("timeout_secs", &self.timeout_secs)
            .field("static_dir", &self.static_dir)
            .field("lenient_json", &self.lenient_json)
            .finish()
    }
}

impl Config {
    /// Reject settings that would only fail later, at request time.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "api key must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "backend timeout must be at least one second".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn decode_mode(&self) -> DecodeMode {
        if self.lenient_json {
            DecodeMode::Lenient
        } else {
            DecodeMode::Strict
        }
    }

    /// The completion backend described by this configuration.
    pub fn backend(&self) -> OpenAiBackend {
        OpenAiBackend::new(&self.base_url).with_api_key(&self.api_key)
    }

    /// An analyzer wired to the given backend with this configuration.
    pub fn analyzer(&self, backend: Arc<dyn CompletionBackend>) -> Analyzer {
        Analyzer::builder(backend)
            .profile(self.profile)
            .model(&self.model)
            .timeout(self.timeout())
            .decode_mode(self.decode_mode())
            .build()
    }
}
