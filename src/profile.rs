//! Analysis profiles and the schema descriptor they share.
//!
//! An [`AnalysisProfile`] picks one of three reply shapes. All three start
//! from the same itemized fields ([`COMMON_FIELDS`]); they differ only in the
//! trailing reflective field. The descriptor is the single source of truth
//! for both the JSON skeleton shown to the model and the checks the
//! [`decoder`](crate::decoder) runs on the reply.

use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Key of the trailing reflective field (narrative and structured profiles).
pub const REFLECTION_KEY: &str = "analisis_psicopedagogico";

/// Closed value set for `intensidad` and `intensidad_emocional`.
pub const INTENSITY_VALUES: &[&str] = &["baja", "moderada", "alta"];

/// Closed value set for `polaridad`.
pub const POLARITY_VALUES: &[&str] = &["positiva", "negativa", "neutral"];

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A string.
    Text,
    /// An array of strings. `shown` is how many placeholders the skeleton lists.
    TextList { shown: usize },
    /// A string restricted to a closed set.
    Enum(&'static [&'static str]),
    /// An array of objects, each matching the nested fields.
    ObjectList(&'static [FieldSpec]),
    /// A single object matching the nested fields.
    Object(&'static [FieldSpec]),
}

/// A required key and the type its value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(key: &'static str, ty: FieldType) -> Self {
        Self { key, ty }
    }
}

const DETAIL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("etiqueta", FieldType::Text),
    FieldSpec::new("descripcion", FieldType::Text),
    FieldSpec::new("intensidad", FieldType::Enum(INTENSITY_VALUES)),
    FieldSpec::new("polaridad", FieldType::Enum(POLARITY_VALUES)),
];

const SHIFT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("seccion", FieldType::Text),
    FieldSpec::new("descripcion", FieldType::Text),
    FieldSpec::new("intensidad_emocional", FieldType::Enum(INTENSITY_VALUES)),
];

const STRUCTURED_REFLECTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("lectura_general", FieldType::Text),
    FieldSpec::new("necesidades", FieldType::TextList { shown: 1 }),
    FieldSpec::new("factores_influyentes", FieldType::TextList { shown: 1 }),
    FieldSpec::new("senales_a_observar", FieldType::TextList { shown: 1 }),
    FieldSpec::new("estrategias", FieldType::TextList { shown: 1 }),
    FieldSpec::new("preguntas_clave", FieldType::TextList { shown: 1 }),
];

/// Fields every profile requires, in the order the skeleton presents them.
pub const COMMON_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("tono_principal", FieldType::TextList { shown: 2 }),
    FieldSpec::new("analisis_detallado", FieldType::ObjectList(DETAIL_FIELDS)),
    FieldSpec::new("emocion_predominante", FieldType::Text),
    FieldSpec::new("cambios_de_tono", FieldType::ObjectList(SHIFT_FIELDS)),
    FieldSpec::new("consejos_mejora_negativos", FieldType::TextList { shown: 1 }),
    FieldSpec::new("consejos_refuerzo_positivos", FieldType::TextList { shown: 1 }),
];

const NARRATIVE_REFLECTION: FieldSpec = FieldSpec::new(REFLECTION_KEY, FieldType::Text);

const STRUCTURED_REFLECTION: FieldSpec =
    FieldSpec::new(REFLECTION_KEY, FieldType::Object(STRUCTURED_REFLECTION_FIELDS));

/// Which reply shape the model is asked for.
///
/// Profiles are plain values fixed at startup; nothing mutates them afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum AnalysisProfile {
    /// Itemized fields only.
    #[default]
    Basic,
    /// Itemized fields plus a reflective paragraph.
    Narrative,
    /// Itemized fields plus a reflective breakdown in six sub-fields.
    Structured,
}

impl AnalysisProfile {
    pub const ALL: [AnalysisProfile; 3] = [
        AnalysisProfile::Basic,
        AnalysisProfile::Narrative,
        AnalysisProfile::Structured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisProfile::Basic => "basic",
            AnalysisProfile::Narrative => "narrative",
            AnalysisProfile::Structured => "structured",
        }
    }

    /// The trailing reflective field, if this profile has one.
    pub fn reflection(&self) -> Option<FieldSpec> {
        match self {
            AnalysisProfile::Basic => None,
            AnalysisProfile::Narrative => Some(NARRATIVE_REFLECTION),
            AnalysisProfile::Structured => Some(STRUCTURED_REFLECTION),
        }
    }

    /// Every required top-level field, trailing reflective field last.
    pub fn fields(&self) -> Vec<FieldSpec> {
        let mut fields = COMMON_FIELDS.to_vec();
        fields.extend(self.reflection());
        fields
    }

    /// Extra role description prepended to the shared instruction.
    pub(crate) fn persona(&self) -> Option<&'static str> {
        match self {
            AnalysisProfile::Basic => None,
            AnalysisProfile::Narrative | AnalysisProfile::Structured => Some(
                "También actúas como orientador psicopedagógico: además del análisis de tono, \
                 ofreces una lectura reflexiva que ayude a quien escribe a comprender lo que siente.",
            ),
        }
    }

    /// Profile-specific rules appended after the shared ones.
    pub(crate) fn extra_rules(&self) -> &'static [&'static str] {
        match self {
            AnalysisProfile::Basic => &[],
            AnalysisProfile::Narrative => &[
                "\"analisis_psicopedagogico\" es un único párrafo en prosa, sin listas ni viñetas.",
                "\"analisis_psicopedagogico\" debe ser la ÚLTIMA clave del objeto.",
                "\"analisis_psicopedagogico\" no debe repetir etiquetas, descripciones ni consejos \
                 ya presentes en los campos anteriores; aporta una lectura nueva e integradora.",
            ],
            AnalysisProfile::Structured => &[
                "\"analisis_psicopedagogico\" es un objeto con exactamente estas claves: \
                 \"lectura_general\" (párrafo breve), \"necesidades\", \"factores_influyentes\", \
                 \"senales_a_observar\", \"estrategias\" y \"preguntas_clave\" (listas de frases).",
                "\"analisis_psicopedagogico\" debe ser la ÚLTIMA clave del objeto.",
                "Ningún sub-campo de \"analisis_psicopedagogico\" debe repetir etiquetas, \
                 descripciones ni consejos ya presentes en los campos anteriores.",
            ],
        }
    }

    /// The JSON skeleton shown to the model, built from [`fields`](Self::fields).
    pub fn skeleton(&self) -> Value {
        Value::Object(skeleton_object(&self.fields()))
    }
}

fn skeleton_object(fields: &[FieldSpec]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.key.to_string(), skeleton_value(&f.ty)))
        .collect()
}

fn skeleton_value(ty: &FieldType) -> Value {
    match ty {
        FieldType::Text => json!("string"),
        FieldType::TextList { shown } => Value::Array(vec![json!("string"); *shown]),
        FieldType::Enum(values) => json!(values.join(" | ")),
        FieldType::ObjectList(fields) => json!([Value::Object(skeleton_object(fields))]),
        FieldType::Object(fields) => Value::Object(skeleton_object(fields)),
    }
}

impl fmt::Display for AnalysisProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AnalysisProfile::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown analysis profile '{}' (expected basic, narrative or structured)",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intensity, Polarity};

    #[test]
    fn test_value_sets_match_typed_enums() {
        let intensities: Vec<&str> = Intensity::ALL.iter().map(|i| i.as_str()).collect();
        let polarities: Vec<&str> = Polarity::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(intensities, INTENSITY_VALUES);
        assert_eq!(polarities, POLARITY_VALUES);
    }

    #[test]
    fn test_reflection_is_always_last() {
        for profile in AnalysisProfile::ALL {
            let fields = profile.fields();
            match profile.reflection() {
                Some(r) => assert_eq!(fields.last(), Some(&r)),
                None => assert!(fields.iter().all(|f| f.key != REFLECTION_KEY)),
            }
        }
    }

    #[test]
    fn test_basic_skeleton_shape() {
        let skeleton = AnalysisProfile::Basic.skeleton();
        let keys: Vec<&str> = skeleton
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec![
                "tono_principal",
                "analisis_detallado",
                "emocion_predominante",
                "cambios_de_tono",
                "consejos_mejora_negativos",
                "consejos_refuerzo_positivos",
            ]
        );
        assert_eq!(skeleton["tono_principal"], json!(["string", "string"]));
        assert_eq!(
            skeleton["analisis_detallado"][0]["polaridad"],
            "positiva | negativa | neutral"
        );
        assert_eq!(
            skeleton["cambios_de_tono"][0]["intensidad_emocional"],
            "baja | moderada | alta"
        );
    }

    #[test]
    fn test_narrative_and_structured_skeletons() {
        let narrative = AnalysisProfile::Narrative.skeleton();
        assert_eq!(narrative[REFLECTION_KEY], "string");

        let structured = AnalysisProfile::Structured.skeleton();
        let reflection = structured[REFLECTION_KEY].as_object().unwrap();
        assert_eq!(reflection.len(), 6);
        assert_eq!(reflection["lectura_general"], "string");
        assert_eq!(reflection["preguntas_clave"], json!(["string"]));
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "Structured".parse::<AnalysisProfile>().unwrap(),
            AnalysisProfile::Structured
        );
        assert_eq!(" basic ".parse::<AnalysisProfile>().unwrap(), AnalysisProfile::Basic);
        assert!("verbose".parse::<AnalysisProfile>().is_err());
    }
}
