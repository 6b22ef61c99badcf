//! System prompt composition.
//!
//! Merges a persona's localized base prompt with optional session context
//! sections in a fixed order. Pure string building; the only fallback is
//! the default language when the active one has no localization.

use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// Optional per-session context appended to the base prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Description of the user's plot/project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Stated user preferences (style, budget, constraints).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    /// Short summary of recent conversation topics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_summary: Option<String>,
}

impl SessionContext {
    /// Whether any section is present.
    pub fn is_empty(&self) -> bool {
        self.project.is_none() && self.preferences.is_none() && self.topic_summary.is_none()
    }
}

/// Response-format guidance appended whenever session context is present.
const FORMAT_GUIDELINES: &str = "Keep answers practical and structured: lead with the \
     recommendation, then the reasoning. Use short lists for step-by-step work. Answer \
     in the language of the user's message.";

/// Build the full system prompt for a persona.
///
/// Sections are appended in a fixed order (project context, user
/// preferences, session/topic summary, response-format guidelines), each
/// under a clear delimiter, so identical inputs always produce the
/// identical string.
pub fn build_system_prompt(
    persona: &Persona,
    language: &str,
    fallback_language: &str,
    context: Option<&SessionContext>,
) -> String {
    let base = persona.system_prompt(language, fallback_language);
    let mut prompt = String::from(base);

    let Some(context) = context.filter(|c| !c.is_empty()) else {
        return prompt;
    };

    if let Some(project) = &context.project {
        prompt.push_str("\n\n--- Project context ---\n");
        prompt.push_str(project);
    }
    if let Some(preferences) = &context.preferences {
        prompt.push_str("\n\n--- User preferences ---\n");
        prompt.push_str(preferences);
    }
    if let Some(summary) = &context.topic_summary {
        prompt.push_str("\n\n--- Recent topics ---\n");
        prompt.push_str(summary);
    }
    prompt.push_str("\n\n--- Response format ---\n");
    prompt.push_str(FORMAT_GUIDELINES);

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{PersonaCatalog, PersonaId};
    use pretty_assertions::assert_eq;

    fn gardener() -> Persona {
        PersonaCatalog::builtin()
            .get(PersonaId::Gardener)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_base_prompt_without_context() {
        let persona = gardener();
        let prompt = build_system_prompt(&persona, "ru", "en", None);
        assert_eq!(prompt, persona.system_prompt("ru", "en"));
    }

    #[test]
    fn test_unsupported_language_falls_back() {
        let persona = gardener();
        let prompt = build_system_prompt(&persona, "de", "en", None);
        assert_eq!(prompt, persona.system_prompt("en", "en"));
    }

    #[test]
    fn test_empty_context_adds_nothing() {
        let persona = gardener();
        let prompt = build_system_prompt(&persona, "en", "en", Some(&SessionContext::default()));
        assert!(!prompt.contains("--- Response format ---"));
    }

    #[test]
    fn test_sections_appear_in_fixed_order() {
        let persona = gardener();
        let context = SessionContext {
            project: Some("6-acre plot, clay soil".into()),
            preferences: Some("low maintenance".into()),
            topic_summary: Some("discussed roses".into()),
        };
        let prompt = build_system_prompt(&persona, "en", "en", Some(&context));

        let project_at = prompt.find("--- Project context ---").unwrap();
        let prefs_at = prompt.find("--- User preferences ---").unwrap();
        let topics_at = prompt.find("--- Recent topics ---").unwrap();
        let format_at = prompt.find("--- Response format ---").unwrap();
        assert!(project_at < prefs_at);
        assert!(prefs_at < topics_at);
        assert!(topics_at < format_at);
    }

    #[test]
    fn test_partial_context_skips_missing_sections() {
        let persona = gardener();
        let context = SessionContext {
            project: None,
            preferences: Some("organic only".into()),
            topic_summary: None,
        };
        let prompt = build_system_prompt(&persona, "en", "en", Some(&context));
        assert!(!prompt.contains("--- Project context ---"));
        assert!(prompt.contains("--- User preferences ---"));
        assert!(prompt.contains("--- Response format ---"));
    }

    #[test]
    fn test_composition_is_idempotent() {
        let persona = gardener();
        let context = SessionContext {
            project: Some("terraced hillside".into()),
            preferences: None,
            topic_summary: Some("drainage questions".into()),
        };
        let first = build_system_prompt(&persona, "ru", "en", Some(&context));
        let second = build_system_prompt(&persona, "ru", "en", Some(&context));
        assert_eq!(first, second);
    }
}
