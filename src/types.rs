use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::profile::AnalysisProfile;

/// A validated request to analyze a piece of text.
///
/// Only [`intake`](crate::intake) constructs these, so `text` is always
/// non-blank. It is kept exactly as submitted (no trimming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    text: String,
}

impl AnalysisRequest {
    pub(crate) fn new_unchecked(text: String) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// A schema-conformant analysis decoded from a model reply.
///
/// Wraps the reply object exactly as the model produced it: serializing an
/// `AnalysisResult` reproduces the original keys in their original order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisResult {
    object: Map<String, Value>,
    #[serde(skip)]
    profile: AnalysisProfile,
}

impl AnalysisResult {
    pub(crate) fn new(object: Map<String, Value>, profile: AnalysisProfile) -> Self {
        Self { object, profile }
    }

    /// The profile this result was validated against.
    pub fn profile(&self) -> AnalysisProfile {
        self.profile
    }

    /// The raw JSON object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }

    /// Deserialize the result into a typed struct.
    pub fn parse_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.object.clone()))
            .map_err(|e| crate::AnalyzerError::MalformedResponse(e.to_string()))
    }

    /// Typed view over the result.
    pub fn report(&self) -> Result<AnalysisReport> {
        self.parse_as()
    }

    /// The predominant emotion label.
    pub fn predominant_emotion(&self) -> Option<&str> {
        self.object
            .get("emocion_predominante")
            .and_then(Value::as_str)
    }
}

/// Intensity of an emotion or tone shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Baja,
    Moderada,
    Alta,
}

impl Intensity {
    pub const ALL: [Intensity; 3] = [Intensity::Baja, Intensity::Moderada, Intensity::Alta];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Baja => "baja",
            Intensity::Moderada => "moderada",
            Intensity::Alta => "alta",
        }
    }
}

impl FromStr for Intensity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Intensity::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| format!("unknown intensity '{}'", s))
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polarity of a detected emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positiva,
    Negativa,
    Neutral,
}

impl Polarity {
    pub const ALL: [Polarity; 3] = [Polarity::Positiva, Polarity::Negativa, Polarity::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positiva => "positiva",
            Polarity::Negativa => "negativa",
            Polarity::Neutral => "neutral",
        }
    }
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Polarity::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown polarity '{}'", s))
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed form of an analysis, for consumers that want structs rather than JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// The two dominant tones, most prominent first.
    #[serde(rename = "tono_principal")]
    pub main_tones: Vec<String>,

    #[serde(rename = "analisis_detallado")]
    pub detailed: Vec<EmotionDetail>,

    #[serde(rename = "emocion_predominante")]
    pub predominant_emotion: String,

    #[serde(rename = "cambios_de_tono")]
    pub tone_shifts: Vec<ToneShift>,

    /// Advice for softening negative aspects.
    #[serde(rename = "consejos_mejora_negativos")]
    pub improvement_tips: Vec<String>,

    /// Advice for reinforcing positive aspects.
    #[serde(rename = "consejos_refuerzo_positivos")]
    pub reinforcement_tips: Vec<String>,

    /// Present for the narrative and structured profiles only.
    #[serde(
        rename = "analisis_psicopedagogico",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reflection: Option<Reflection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionDetail {
    #[serde(rename = "etiqueta")]
    pub label: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "intensidad")]
    pub intensity: Intensity,
    #[serde(rename = "polaridad")]
    pub polarity: Polarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneShift {
    #[serde(rename = "seccion")]
    pub section: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "intensidad_emocional")]
    pub emotional_intensity: Intensity,
}

/// The trailing reflective field: a paragraph or a structured breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reflection {
    Narrative(String),
    Structured(StructuredReflection),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReflection {
    #[serde(rename = "lectura_general")]
    pub general_reading: String,
    #[serde(rename = "necesidades")]
    pub needs: Vec<String>,
    #[serde(rename = "factores_influyentes")]
    pub influencing_factors: Vec<String>,
    #[serde(rename = "senales_a_observar")]
    pub signals_to_watch: Vec<String>,
    #[serde(rename = "estrategias")]
    pub strategies: Vec<String>,
    #[serde(rename = "preguntas_clave")]
    pub key_questions: Vec<String>,
}
