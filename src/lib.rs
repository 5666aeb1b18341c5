//! # Tone Analyzer
//!
//! Turns a block of free-form text into a structured emotional tone analysis
//! by asking an LLM for a JSON object and checking the reply against a schema.
//!
//! Each request runs the same linear pipeline:
//!
//! ```text
//! intake ──► prompt ──► backend ──► decoder ──► AnalysisResult
//! ```
//!
//! ## Core Concepts
//!
//! - **[`AnalysisProfile`]**: which reply shape is requested: `Basic`,
//!   `Narrative` (adds a reflective paragraph) or `Structured` (adds a
//!   reflective breakdown).
//! - **[`PromptComposer`]**: renders the profile's system instruction once
//!   and builds the user message for each request.
//! - **[`CompletionBackend`]**: object-safe trait over the text-completion
//!   service. [`OpenAiBackend`] talks to OpenAI-compatible APIs,
//!   [`MockBackend`] serves canned replies in tests.
//! - **[`ResponseDecoder`]**: rejects replies that are not one JSON object
//!   (`MalformedResponse`) or that break the profile's contract
//!   (`SchemaViolation`).
//! - **[`Analyzer`]**: wires the above together with a bounded timeout.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tone_analyzer::{AnalysisProfile, Analyzer, OpenAiBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = OpenAiBackend::new("https://api.openai.com").with_api_key("sk-...");
//!     let analyzer = Analyzer::builder(Arc::new(backend))
//!         .profile(AnalysisProfile::Structured)
//!         .build();
//!
//!     let result = analyzer.analyze_text("Hoy me siento agotado pero esperanzado.").await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod backend;
pub mod config;
pub mod decoder;
pub mod error;
pub mod intake;
pub mod profile;
pub mod prompt;
pub mod server;
pub mod types;

pub use analyzer::{Analyzer, AnalyzerBuilder};
pub use backend::{CompletionBackend, MockBackend, OpenAiBackend};
pub use config::Config;
pub use decoder::{DecodeMode, ResponseDecoder};
pub use error::{AnalyzerError, ErrorKind, Result, SchemaIssue};
pub use profile::AnalysisProfile;
pub use prompt::{ComposedPrompt, PromptComposer};
pub use server::make_app;
pub use types::{AnalysisReport, AnalysisRequest, AnalysisResult, Intensity, Polarity};
