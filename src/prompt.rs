//! Prompt composition.
//!
//! The system instruction is rendered once per profile, when the
//! [`PromptComposer`] is built. Per request only the user message changes.

use crate::backend::ChatMessage;
use crate::profile::AnalysisProfile;
use crate::types::AnalysisRequest;

/// Literal prefix of every user message; the submitted text follows it verbatim.
pub const USER_PREFIX: &str = "Text to analyze:\n\n";

/// Sentinel that should never appear in real templates.
const ESCAPE_SENTINEL: &str = "\x00LBRACE\x00";
/// Sentinel for escaped closing brace.
const ESCAPE_SENTINEL_CLOSE: &str = "\x00RBRACE\x00";

const INSTRUCTION_TEMPLATE: &str = "\
Eres un analizador experto de tono emocional en texto escrito.{persona}
Siempre debes responder en un SOLO objeto JSON válido.

Estructura EXACTA del JSON:

{schema}

{rules}";

const SHARED_RULES: &[&str] = &[
    "Responde únicamente con el objeto JSON, sin texto antes ni después y sin bloques de código.",
    "Incluye todas las claves de la estructura, aunque alguna lista quede vacía.",
    "\"intensidad\" e \"intensidad_emocional\" solo pueden valer \"baja\", \"moderada\" o \"alta\".",
    "\"polaridad\" solo puede valer \"positiva\", \"negativa\" o \"neutral\".",
    "\"tono_principal\" contiene exactamente dos etiquetas, la más marcada primero.",
];

/// Substitute `{key}` placeholders in a template.
///
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
/// Unknown placeholders are left untouched.
///
/// # Example
///
/// ```
/// use tone_analyzer::prompt::render;
///
/// let result = render("Hello {name}, JSON: {{\"key\": \"val\"}}", &[("name", "Alice")]);
/// assert_eq!(result, r#"Hello Alice, JSON: {"key": "val"}"#);
/// ```
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    // Pass 1: protect escaped braces
    let mut rendered = template.replace("{{", ESCAPE_SENTINEL);
    rendered = rendered.replace("}}", ESCAPE_SENTINEL_CLOSE);

    // Pass 2: substitute placeholders
    for (key, value) in vars {
        let placeholder = format!("{{{}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }

    // Pass 3: restore escaped braces
    rendered = rendered.replace(ESCAPE_SENTINEL, "{");
    rendered = rendered.replace(ESCAPE_SENTINEL_CLOSE, "}");
    rendered
}

/// Create a numbered list from items (1-indexed).
pub fn numbered_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap text in a labeled section.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

/// Render the full system instruction for a profile.
pub fn system_instruction(profile: AnalysisProfile) -> String {
    let persona = profile
        .persona()
        .map(|p| format!("\n{}", p))
        .unwrap_or_default();

    // Pretty-printing a `Value` cannot fail.
    let schema = serde_json::to_string_pretty(&profile.skeleton()).unwrap_or_default();

    let rules: Vec<&str> = SHARED_RULES
        .iter()
        .chain(profile.extra_rules())
        .copied()
        .collect();
    let rules = section("Reglas", &numbered_list(&rules));

    render(
        INSTRUCTION_TEMPLATE,
        &[("persona", &persona), ("schema", &schema), ("rules", &rules)],
    )
    .trim()
    .to_string()
}

/// The two messages sent to the completion backend for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

impl ComposedPrompt {
    /// System message first, then the user message.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Builds prompts for one fixed profile.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    profile: AnalysisProfile,
    system: String,
}

impl PromptComposer {
    pub fn new(profile: AnalysisProfile) -> Self {
        Self {
            profile,
            system: system_instruction(profile),
        }
    }

    pub fn profile(&self) -> AnalysisProfile {
        self.profile
    }

    /// The pre-rendered system instruction.
    pub fn system_instruction(&self) -> &str {
        &self.system
    }

    /// Compose the prompt for a request. Pure: same input, same output.
    pub fn compose(&self, request: &AnalysisRequest) -> ComposedPrompt {
        ComposedPrompt {
            system: self.system.clone(),
            user: format!("{}{}", USER_PREFIX, request.text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Role;
    use crate::intake;

    fn request(text: &str) -> AnalysisRequest {
        intake::validate_text(text).unwrap()
    }

    #[test]
    fn test_render_basic() {
        let result = render("Hello {name}, process {input}", &[("name", "Alice"), ("input", "data")]);
        assert_eq!(result, "Hello Alice, process data");
    }

    #[test]
    fn test_render_no_placeholders() {
        let result = render("static prompt", &[]);
        assert_eq!(result, "static prompt");
    }

    #[test]
    fn test_render_escaped_braces_no_substitution() {
        let result = render("Output format: {{\"result\": {{\"value\": 42}}}}", &[]);
        assert_eq!(result, r#"Output format: {"result": {"value": 42}}"#);
    }

    #[test]
    fn test_numbered_list() {
        assert_eq!(numbered_list(&["First", "Second"]), "1. First\n2. Second");
        assert_eq!(numbered_list::<&str>(&[]), "");
    }

    #[test]
    fn test_section() {
        assert_eq!(section("Reglas", "1. a"), "## Reglas\n1. a");
    }

    #[test]
    fn test_user_message_has_literal_prefix() {
        let composer = PromptComposer::new(AnalysisProfile::Basic);
        let text = "Hoy me siento agotado pero esperanzado.";
        let prompt = composer.compose(&request(text));
        assert_eq!(prompt.user, format!("Text to analyze:\n\n{}", text));
    }

    #[test]
    fn test_user_text_is_not_templated() {
        let composer = PromptComposer::new(AnalysisProfile::Basic);
        let text = "  braces {schema} and {{rules}} stay  ";
        let prompt = composer.compose(&request(text));
        assert_eq!(prompt.user, format!("{}{}", USER_PREFIX, text));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = PromptComposer::new(AnalysisProfile::Structured);
        let a = composer.compose(&request("texto"));
        let b = composer.compose(&request("texto"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_system_instruction_embeds_schema_and_rules() {
        let system = system_instruction(AnalysisProfile::Basic);
        assert!(system.starts_with("Eres un analizador experto"));
        assert!(system.contains("\"tono_principal\": ["));
        assert!(system.contains("\"intensidad\": \"baja | moderada | alta\""));
        assert!(system.contains("## Reglas\n1. "));
        assert!(!system.contains("{schema}"));
        assert!(!system.contains("{persona}"));
        assert!(!system.contains("analisis_psicopedagogico"));
    }

    #[test]
    fn test_reflective_profiles_demand_last_key_and_no_duplication() {
        for profile in [AnalysisProfile::Narrative, AnalysisProfile::Structured] {
            let system = system_instruction(profile);
            assert!(system.contains("orientador psicopedagógico"), "{profile}");
            assert!(system.contains("ÚLTIMA clave"), "{profile}");
            assert!(system.contains("debe repetir"), "{profile}");
        }
        assert!(system_instruction(AnalysisProfile::Structured).contains("\"senales_a_observar\""));
    }

    #[test]
    fn test_into_messages_order() {
        let composer = PromptComposer::new(AnalysisProfile::Narrative);
        let messages = composer.compose(&request("hola")).into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, composer.system_instruction());
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Text to analyze:\n\nhola");
    }
}
