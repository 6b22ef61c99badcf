//! Persona selection over the keyword lexicon.
//!
//! A pure scoring pass: the message is checked against the out-of-scope
//! set first, then scored against every active persona's weighted trigger
//! phrases with tiered matching. The strictly highest total wins; ties
//! resolve by `PersonaId` declaration order so selection is reproducible.

use serde::{Deserialize, Serialize};

use crate::config::ScorerConfig;
use crate::error::SelectionError;
use crate::lexicon::Lexicon;
use crate::persona::{PersonaCatalog, PersonaId};

/// Match-tier values: exact whole-message, prefix/suffix, substring.
const TIER_EXACT: u32 = 3;
const TIER_AFFIX: u32 = 2;
const TIER_CONTAINS: u32 = 1;

/// A persona's score for one message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub persona: PersonaId,
    pub score: u32,
    pub confidence: f64,
}

/// The result of scoring one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionResult {
    /// A persona won the scoring pass.
    Matched {
        persona: PersonaId,
        confidence: f64,
        score: u32,
    },
    /// The message hit the out-of-scope keyword set; no persona was scored.
    OutOfScope { matched_phrase: String },
    /// Selection could not produce a persona.
    Failed(SelectionError),
}

/// Normalize a message for matching: trim, lowercase, and drop terminal
/// punctuation so suffix-tier matches fire on interrogative messages.
fn preprocess(message: &str) -> String {
    message
        .trim()
        .to_lowercase()
        .trim_end_matches(['?', '!', '.', '…', ',', ';', ':'])
        .trim_end()
        .to_string()
}

/// Tier value for a single keyword against the normalized message.
fn match_tier(message: &str, phrase: &str) -> u32 {
    if message == phrase {
        TIER_EXACT
    } else if message.starts_with(phrase) || message.ends_with(phrase) {
        TIER_AFFIX
    } else if message.contains(phrase) {
        TIER_CONTAINS
    } else {
        0
    }
}

/// Total score of one persona's keyword list against the message.
///
/// All matching keywords contribute (no early exit); each contribution is
/// the tier value multiplied by the keyword weight.
fn score_persona(message: &str, lexicon: &Lexicon, id: PersonaId) -> u32 {
    lexicon
        .keywords_for(id)
        .map(|keyword| match_tier(message, &keyword.phrase.to_lowercase()) * keyword.weight)
        .sum()
}

/// Score the message against every active persona.
pub fn score_candidates(
    message: &str,
    lexicon: &Lexicon,
    catalog: &PersonaCatalog,
    config: &ScorerConfig,
) -> Vec<ScoredCandidate> {
    let normalized = preprocess(message);
    catalog
        .active_personas()
        .map(|persona| {
            let score = score_persona(&normalized, lexicon, persona.id);
            ScoredCandidate {
                persona: persona.id,
                score,
                confidence: confidence(score, config),
            }
        })
        .collect()
}

fn confidence(score: u32, config: &ScorerConfig) -> f64 {
    (f64::from(score) / config.normalization).min(1.0)
}

/// Select the persona that should answer `message`.
///
/// Pure over its inputs: identical message and lexicon always produce the
/// identical result. Both language keyword sets are checked; the message
/// language is not detected.
pub fn select_persona(
    message: &str,
    lexicon: &Lexicon,
    catalog: &PersonaCatalog,
    config: &ScorerConfig,
) -> SelectionResult {
    let normalized = preprocess(message);
    if normalized.is_empty() {
        return SelectionResult::Failed(SelectionError::EmptyInput);
    }

    // Out-of-scope check short-circuits persona scoring.
    for phrase in lexicon.out_of_scope_phrases() {
        if normalized.contains(&phrase.to_lowercase()) {
            return SelectionResult::OutOfScope {
                matched_phrase: phrase.to_string(),
            };
        }
    }

    let mut best: Option<ScoredCandidate> = None;
    for persona in catalog.active_personas() {
        let score = score_persona(&normalized, lexicon, persona.id);
        // Strictly-greater keeps the earliest-declared persona on ties.
        if score > 0 && best.map_or(true, |b| score > b.score) {
            best = Some(ScoredCandidate {
                persona: persona.id,
                score,
                confidence: confidence(score, config),
            });
        }
    }

    match best {
        Some(candidate) => SelectionResult::Matched {
            persona: candidate.persona,
            confidence: candidate.confidence,
            score: candidate.score,
        },
        None => SelectionResult::Failed(SelectionError::NoMatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixtures() -> (Lexicon, PersonaCatalog, ScorerConfig) {
        (
            Lexicon::builtin(),
            PersonaCatalog::builtin(),
            ScorerConfig::default(),
        )
    }

    #[test]
    fn test_preprocess_strips_case_and_punctuation() {
        assert_eq!(preprocess("  Какие розы посадить?  "), "какие розы посадить");
        assert_eq!(preprocess("Plant ROSES!"), "plant roses");
        assert_eq!(preprocess("..."), "");
    }

    #[test]
    fn test_match_tiers() {
        assert_eq!(match_tier("роза", "роза"), TIER_EXACT);
        assert_eq!(match_tier("роза в саду", "роза"), TIER_AFFIX);
        assert_eq!(match_tier("моя роза", "роза"), TIER_AFFIX);
        assert_eq!(match_tier("про розу и газон", "газон"), TIER_AFFIX);
        assert_eq!(match_tier("ваша роза цветёт", "роза"), TIER_CONTAINS);
        assert_eq!(match_tier("тюльпан", "роза"), 0);
    }

    #[test]
    fn test_empty_message_fails() {
        let (lexicon, catalog, config) = fixtures();
        assert_eq!(
            select_persona("   ", &lexicon, &catalog, &config),
            SelectionResult::Failed(SelectionError::EmptyInput)
        );
    }

    #[test]
    fn test_no_match_fails() {
        let (lexicon, catalog, config) = fixtures();
        assert_eq!(
            select_persona("квантовая хромодинамика", &lexicon, &catalog, &config),
            SelectionResult::Failed(SelectionError::NoMatch)
        );
    }

    #[test]
    fn test_russian_roses_select_gardener() {
        let (lexicon, catalog, config) = fixtures();
        match select_persona("Какие розы посадить?", &lexicon, &catalog, &config) {
            SelectionResult::Matched {
                persona,
                confidence,
                ..
            } => {
                assert_eq!(persona, PersonaId::Gardener);
                assert!(confidence >= 0.6, "confidence was {}", confidence);
            }
            other => panic!("Expected gardener match, got {:?}", other),
        }
    }

    #[test]
    fn test_weather_is_out_of_scope() {
        let (lexicon, catalog, config) = fixtures();
        match select_persona("What's the weather like?", &lexicon, &catalog, &config) {
            SelectionResult::OutOfScope { matched_phrase } => {
                assert_eq!(matched_phrase, "weather");
            }
            other => panic!("Expected out-of-scope, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_scope_beats_persona_overlap() {
        let (lexicon, catalog, config) = fixtures();
        // Mentions roses, but the out-of-scope check runs first.
        let result = select_persona(
            "What's the weather like for roses today?",
            &lexicon,
            &catalog,
            &config,
        );
        assert!(matches!(result, SelectionResult::OutOfScope { .. }));
    }

    #[test]
    fn test_tie_breaks_by_declaration_order() {
        let (lexicon, catalog, config) = fixtures();
        // One substring hit each for gardener ("роза") and builder ("забор").
        match select_persona("нужны забор и роза на участке?", &lexicon, &catalog, &config) {
            SelectionResult::Matched { persona, .. } => {
                // "участок" also scores landscape designer; the point is that
                // repeated runs always pick the same persona.
                for _ in 0..10 {
                    let again =
                        select_persona("нужны забор и роза на участке?", &lexicon, &catalog, &config);
                    match again {
                        SelectionResult::Matched { persona: p, .. } => assert_eq!(p, persona),
                        other => panic!("Expected match, got {:?}", other),
                    }
                }
            }
            other => panic!("Expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_tie_prefers_first_declared() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            [entries.gardener]
            en = ["shared-term"]

            [entries.builder]
            en = ["shared-term"]
        "#,
        )
        .unwrap();
        let catalog = PersonaCatalog::builtin();
        let config = ScorerConfig::default();

        match select_persona("about shared-term please", &lexicon, &catalog, &config) {
            SelectionResult::Matched { persona, .. } => {
                assert_eq!(persona, PersonaId::Gardener);
            }
            other => panic!("Expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_scores_accumulate_across_keywords() {
        let (lexicon, catalog, config) = fixtures();
        let single = score_candidates("роза", &lexicon, &catalog, &config);
        let double = score_candidates("роза и полив", &lexicon, &catalog, &config);
        let gardener_single = single
            .iter()
            .find(|c| c.persona == PersonaId::Gardener)
            .unwrap();
        let gardener_double = double
            .iter()
            .find(|c| c.persona == PersonaId::Gardener)
            .unwrap();
        assert!(gardener_double.score > gardener_single.score);
    }

    #[test]
    fn test_confidence_is_capped() {
        let config = ScorerConfig { normalization: 1.0 };
        let (lexicon, catalog, _) = fixtures();
        for candidate in score_candidates("роза посадить полив грядка", &lexicon, &catalog, &config)
        {
            assert!(candidate.confidence <= 1.0);
        }
    }

    #[test]
    fn test_weighted_keyword_scales_score() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            [entries.gardener]
            en = [{ phrase = "orchid", weight = 3 }]
        "#,
        )
        .unwrap();
        let catalog = PersonaCatalog::builtin();
        let config = ScorerConfig::default();

        match select_persona("my orchid is wilting", &lexicon, &catalog, &config) {
            SelectionResult::Matched { score, .. } => assert_eq!(score, 3),
            other => panic!("Expected match, got {:?}", other),
        }
    }
}
