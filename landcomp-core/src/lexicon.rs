//! Weighted keyword lexicon for persona selection.
//!
//! A single declarative table: persona → language → weighted trigger
//! phrases, plus a per-language out-of-scope keyword set. Built once at
//! startup from the builtin data (or a TOML file) and never mutated, so
//! the selector stays a pure function over an explicit table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;
use crate::persona::PersonaId;

/// A single weighted trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub phrase: String,
    /// Multiplier applied to the match-tier value; defaults to 1.
    pub weight: u32,
}

impl Keyword {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            weight: 1,
        }
    }

    pub fn weighted(phrase: impl Into<String>, weight: u32) -> Self {
        Self {
            phrase: phrase.into(),
            weight,
        }
    }
}

// TOML accepts either a bare phrase string or a { phrase, weight } table.
impl<'de> Deserialize<'de> for Keyword {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Spec {
            Phrase(String),
            Full { phrase: String, weight: u32 },
        }
        Ok(match Spec::deserialize(deserializer)? {
            Spec::Phrase(phrase) => Keyword::new(phrase),
            Spec::Full { phrase, weight } => Keyword::weighted(phrase, weight),
        })
    }
}

/// Keyword lists for one persona, keyed by language code.
pub type PersonaKeywords = HashMap<String, Vec<Keyword>>;

/// The complete lexicon table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lexicon {
    /// Trigger phrases per persona per language.
    #[serde(default)]
    entries: HashMap<PersonaId, PersonaKeywords>,
    /// Negative keywords per language; a match here marks the whole
    /// message out of scope before any persona is scored.
    #[serde(default)]
    out_of_scope: HashMap<String, Vec<String>>,
}

impl Lexicon {
    /// Keywords for a persona across all languages, in stable order.
    pub fn keywords_for(&self, id: PersonaId) -> impl Iterator<Item = &Keyword> {
        self.entries
            .get(&id)
            .into_iter()
            .flat_map(|by_lang| {
                let mut langs: Vec<&String> = by_lang.keys().collect();
                langs.sort();
                langs
                    .into_iter()
                    .filter_map(move |lang| by_lang.get(lang))
                    .flatten()
            })
    }

    /// Out-of-scope phrases across all languages.
    pub fn out_of_scope_phrases(&self) -> impl Iterator<Item = &str> {
        let mut langs: Vec<&String> = self.out_of_scope.keys().collect();
        langs.sort();
        langs
            .into_iter()
            .filter_map(|lang| self.out_of_scope.get(lang))
            .flatten()
            .map(String::as_str)
    }

    /// Personas that have at least one keyword, in declaration order.
    pub fn personas(&self) -> impl Iterator<Item = PersonaId> + '_ {
        PersonaId::ALL
            .into_iter()
            .filter(|id| self.entries.contains_key(id))
    }

    /// Parse a lexicon from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::ParseError {
            message: format!("lexicon: {}", e),
        })
    }

    /// Merge another lexicon on top of this one. Keyword lists from
    /// `overlay` replace same-(persona, language) lists; out-of-scope
    /// lists replace per language.
    pub fn merge(&mut self, overlay: Lexicon) {
        for (id, by_lang) in overlay.entries {
            let slot = self.entries.entry(id).or_default();
            for (lang, keywords) in by_lang {
                slot.insert(lang, keywords);
            }
        }
        for (lang, phrases) in overlay.out_of_scope {
            self.out_of_scope.insert(lang, phrases);
        }
    }

    /// The builtin RU/EN lexicon shipped with the crate.
    pub fn builtin() -> Self {
        let mut lexicon = Lexicon::default();

        lexicon.insert_keywords(
            PersonaId::Gardener,
            "ru",
            &[
                "роза", "розы", "посадить", "посадка", "сажать", "растение",
                "растения", "цветы", "цветник", "обрезка", "обрезать", "полив",
                "поливать", "удобрение", "подкормка", "почва", "грядка",
                "грядки", "рассада", "семена", "газонная трава", "тля",
                "вредители", "болезни растений", "яблоня", "смородина",
                "теплица", "куст", "кустарник", "дерево", "саженец", "прививка",
                "мульча", "компостная яма",
            ],
        );
        lexicon.insert_keywords(
            PersonaId::Gardener,
            "en",
            &[
                "rose", "roses", "plant", "planting", "prune", "pruning",
                "flower", "flowers", "seedling", "seeds", "soil", "watering",
                "fertilizer", "fertilize", "aphid", "pests", "greenhouse",
                "shrub", "fruit tree", "apple tree", "mulch", "grafting",
                "flower bed", "vegetable bed",
            ],
        );

        lexicon.insert_keywords(
            PersonaId::LandscapeDesigner,
            "ru",
            &[
                "дизайн", "ландшафт", "ландшафтный", "зонирование", "планировка",
                "дорожка", "дорожки", "мощение", "газон", "клумба", "альпийская горка",
                "рокарий", "водоём", "пруд", "фонтан", "освещение участка",
                "живая изгородь", "композиция", "миксбордер", "палисадник",
                "участок", "сотки", "проект участка",
            ],
        );
        lexicon.insert_keywords(
            PersonaId::LandscapeDesigner,
            "en",
            &[
                "design", "landscape", "landscaping", "zoning", "layout",
                "path", "paving", "lawn", "rockery", "pond", "fountain",
                "garden lighting", "hedge", "composition", "mixed border",
                "front yard", "backyard", "plot plan",
            ],
        );

        lexicon.insert_keywords(
            PersonaId::Builder,
            "ru",
            &[
                "строительство", "построить", "стройка", "фундамент", "забор",
                "беседка", "пергола", "терраса", "веранда", "навес", "сарай",
                "подпорная стенка", "дренаж", "отмостка", "бетон", "кирпич",
                "брус", "крыша", "кровля", "септик", "колодец", "скважина",
                "смета", "материалы",
            ],
        );
        lexicon.insert_keywords(
            PersonaId::Builder,
            "en",
            &[
                "build", "construction", "foundation", "fence", "gazebo",
                "pergola", "terrace", "deck", "shed", "retaining wall",
                "drainage", "concrete", "brick", "timber", "roof", "roofing",
                "septic", "well", "borehole", "estimate", "materials",
            ],
        );

        lexicon.insert_keywords(
            PersonaId::Ecologist,
            "ru",
            &[
                "экология", "экологичный", "компост", "компостирование",
                "биоразнообразие", "опылители", "пчёлы", "дождевая вода",
                "переработка", "органический", "пестициды", "гербициды",
                "почвенное здоровье", "сидераты", "природный", "устойчивый",
                "микроклимат", "грунтовые воды",
            ],
        );
        lexicon.insert_keywords(
            PersonaId::Ecologist,
            "en",
            &[
                "ecology", "eco-friendly", "compost", "composting",
                "biodiversity", "pollinators", "bees", "rainwater",
                "recycling", "organic", "pesticides", "herbicides",
                "soil health", "cover crops", "sustainable", "wildlife",
                "groundwater", "native plants",
            ],
        );

        lexicon.out_of_scope.insert(
            "ru".to_string(),
            [
                "погода", "прогноз погоды", "курс валют", "новости", "политика",
                "рецепт", "приготовить ужин", "кино", "фильм", "гороскоп",
                "футбол", "анекдот",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        lexicon.out_of_scope.insert(
            "en".to_string(),
            [
                "weather", "weather forecast", "exchange rate", "news",
                "politics", "recipe", "cook dinner", "movie", "horoscope",
                "football score", "joke",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        lexicon
    }

    fn insert_keywords(&mut self, id: PersonaId, lang: &str, phrases: &[&str]) {
        let keywords = phrases.iter().map(|p| Keyword::new(*p)).collect();
        self.entries
            .entry(id)
            .or_default()
            .insert(lang.to_string(), keywords);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_all_personas() {
        let lexicon = Lexicon::builtin();
        let personas: Vec<PersonaId> = lexicon.personas().collect();
        assert_eq!(personas, PersonaId::ALL.to_vec());
    }

    #[test]
    fn test_builtin_has_both_languages() {
        let lexicon = Lexicon::builtin();
        let phrases: Vec<&str> = lexicon
            .keywords_for(PersonaId::Gardener)
            .map(|k| k.phrase.as_str())
            .collect();
        assert!(phrases.contains(&"роза"));
        assert!(phrases.contains(&"rose"));
    }

    #[test]
    fn test_out_of_scope_includes_weather() {
        let lexicon = Lexicon::builtin();
        let phrases: Vec<&str> = lexicon.out_of_scope_phrases().collect();
        assert!(phrases.contains(&"weather"));
        assert!(phrases.contains(&"погода"));
    }

    #[test]
    fn test_keyword_default_weight() {
        assert_eq!(Keyword::new("rose").weight, 1);
        assert_eq!(Keyword::weighted("rose", 3).weight, 3);
    }

    #[test]
    fn test_from_toml_bare_and_weighted() {
        let toml_src = r#"
            [out_of_scope]
            en = ["weather"]

            [entries.gardener]
            en = ["rose", { phrase = "orchid care", weight = 2 }]
        "#;
        let lexicon = Lexicon::from_toml_str(toml_src).unwrap();
        let keywords: Vec<Keyword> = lexicon.keywords_for(PersonaId::Gardener).cloned().collect();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0], Keyword::new("rose"));
        assert_eq!(keywords[1], Keyword::weighted("orchid care", 2));
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(Lexicon::from_toml_str("entries = 42").is_err());
    }

    #[test]
    fn test_merge_replaces_language_lists() {
        let mut base = Lexicon::builtin();
        let overlay = Lexicon::from_toml_str(
            r#"
            [entries.gardener]
            en = ["bonsai"]
        "#,
        )
        .unwrap();
        base.merge(overlay);

        let en_phrases: Vec<&str> = base
            .keywords_for(PersonaId::Gardener)
            .map(|k| k.phrase.as_str())
            .filter(|p| p.is_ascii())
            .collect();
        assert_eq!(en_phrases, vec!["bonsai"]);
        // Russian list untouched.
        assert!(base
            .keywords_for(PersonaId::Gardener)
            .any(|k| k.phrase == "роза"));
    }
}
