//! Specialist persona catalog.
//!
//! Four built-in expert personas (Gardener, LandscapeDesigner, Builder,
//! Ecologist), each carrying localized display names, system prompts, and
//! quick-start suggestions. Personas are immutable after startup; the
//! declaration order of `PersonaId` is the documented tie-break priority
//! used by the selector.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies a specialist persona.
///
/// Declaration order doubles as the deterministic tie-break priority:
/// when two personas score equally, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaId {
    /// Plant care, planting, soil, and seasonal garden work.
    Gardener,
    /// Site planning, zoning, paths, and decorative composition.
    LandscapeDesigner,
    /// Outdoor construction: foundations, fences, pergolas, drainage works.
    Builder,
    /// Ecosystems, biodiversity, water, and sustainable land use.
    Ecologist,
}

impl PersonaId {
    /// All personas in declaration (priority) order.
    pub const ALL: [PersonaId; 4] = [
        PersonaId::Gardener,
        PersonaId::LandscapeDesigner,
        PersonaId::Builder,
        PersonaId::Ecologist,
    ];

    /// Stable machine identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaId::Gardener => "gardener",
            PersonaId::LandscapeDesigner => "landscape_designer",
            PersonaId::Builder => "builder",
            PersonaId::Ecologist => "ecologist",
        }
    }
}

impl std::fmt::Display for PersonaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a persona ID from a string.
pub fn parse_persona_id(s: &str) -> Option<PersonaId> {
    match s.to_lowercase().as_str() {
        "gardener" | "garden" => Some(PersonaId::Gardener),
        "landscape_designer" | "landscape" | "designer" => Some(PersonaId::LandscapeDesigner),
        "builder" | "construction" => Some(PersonaId::Builder),
        "ecologist" | "ecology" | "eco" => Some(PersonaId::Ecologist),
        _ => None,
    }
}

/// An immutable persona record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    /// Display name per language code.
    pub display_names: HashMap<String, String>,
    /// Base system prompt per language code.
    pub system_prompts: HashMap<String, String>,
    /// Quick-start suggestions per language code.
    pub suggestions: HashMap<String, Vec<String>>,
    /// Inactive personas are skipped by the selector.
    pub active: bool,
}

impl Persona {
    /// Localized display name, falling back to `fallback_lang`.
    pub fn display_name(&self, lang: &str, fallback_lang: &str) -> &str {
        self.display_names
            .get(lang)
            .or_else(|| self.display_names.get(fallback_lang))
            .map(String::as_str)
            .unwrap_or(self.id.as_str())
    }

    /// Localized base system prompt, falling back to `fallback_lang`.
    pub fn system_prompt(&self, lang: &str, fallback_lang: &str) -> &str {
        self.system_prompts
            .get(lang)
            .or_else(|| self.system_prompts.get(fallback_lang))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Localized quick-start suggestions, falling back to `fallback_lang`.
    pub fn suggestions(&self, lang: &str, fallback_lang: &str) -> &[String] {
        self.suggestions
            .get(lang)
            .or_else(|| self.suggestions.get(fallback_lang))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The immutable persona catalog built once at startup.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Build the catalog of built-in personas.
    pub fn builtin() -> Self {
        Self {
            personas: PersonaId::ALL.iter().map(|id| builtin_persona(*id)).collect(),
        }
    }

    /// Personas in declaration (priority) order.
    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Active personas in declaration order.
    pub fn active_personas(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter().filter(|p| p.active)
    }

    /// Look up a persona by ID.
    pub fn get(&self, id: PersonaId) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn localized(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(lang, value)| (lang.to_string(), value.to_string()))
        .collect()
}

fn localized_list(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(lang, values)| {
            (
                lang.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

fn builtin_persona(id: PersonaId) -> Persona {
    match id {
        PersonaId::Gardener => Persona {
            id,
            display_names: localized(&[("en", "Gardener"), ("ru", "Садовник")]),
            system_prompts: localized(&[
                (
                    "en",
                    "You are an experienced gardener assisting owners of private \
                     gardens. You advise on plant selection, planting and pruning, \
                     soil preparation, watering, fertilizing, and pest and disease \
                     control for the temperate climate. Give practical, season-aware \
                     answers and name specific cultivars where it helps.",
                ),
                (
                    "ru",
                    "Ты опытный садовник и помогаешь владельцам частных садов. \
                     Ты консультируешь по выбору растений, посадке и обрезке, \
                     подготовке почвы, поливу, подкормкам и защите от вредителей \
                     и болезней в умеренном климате. Давай практичные ответы с \
                     учётом сезона и называй конкретные сорта, когда это уместно.",
                ),
            ]),
            suggestions: localized_list(&[
                (
                    "en",
                    &[
                        "Which roses suit a shaded corner?",
                        "How do I prepare beds for spring planting?",
                        "What is eating my apple tree leaves?",
                    ],
                ),
                (
                    "ru",
                    &[
                        "Какие розы подойдут для тенистого уголка?",
                        "Как подготовить грядки к весенней посадке?",
                        "Что делать с тлёй на яблоне?",
                    ],
                ),
            ]),
            active: true,
        },
        PersonaId::LandscapeDesigner => Persona {
            id,
            display_names: localized(&[("en", "Landscape Designer"), ("ru", "Ландшафтный дизайнер")]),
            system_prompts: localized(&[
                (
                    "en",
                    "You are a landscape designer helping plan private plots. You \
                     advise on zoning, composition, paths and paving, lighting, \
                     lawns, water features, and combining plants for year-round \
                     decorative effect. Suggest layouts that respect the plot's \
                     orientation, relief, and the owner's budget.",
                ),
                (
                    "ru",
                    "Ты ландшафтный дизайнер и помогаешь планировать частные \
                     участки. Ты консультируешь по зонированию, композиции, \
                     дорожкам и мощению, освещению, газонам, водоёмам и подбору \
                     растений для круглогодичной декоративности. Предлагай \
                     решения с учётом ориентации участка, рельефа и бюджета.",
                ),
            ]),
            suggestions: localized_list(&[
                (
                    "en",
                    &[
                        "How do I zone a narrow 6-acre plot?",
                        "What paving works for a curved garden path?",
                        "Plan a flower bed that blooms all summer",
                    ],
                ),
                (
                    "ru",
                    &[
                        "Как зонировать узкий участок шесть соток?",
                        "Какое мощение выбрать для извилистой дорожки?",
                        "Составь клумбу непрерывного цветения",
                    ],
                ),
            ]),
            active: true,
        },
        PersonaId::Builder => Persona {
            id,
            display_names: localized(&[("en", "Builder"), ("ru", "Строитель")]),
            system_prompts: localized(&[
                (
                    "en",
                    "You are a construction specialist for private plots. You advise \
                     on foundations, fences, gazebos, pergolas, terraces, retaining \
                     walls, and drainage works. Explain materials, load-bearing \
                     considerations, and realistic sequencing; flag anything that \
                     needs a licensed engineer.",
                ),
                (
                    "ru",
                    "Ты специалист по строительству на частных участках. Ты \
                     консультируешь по фундаментам, заборам, беседкам, перголам, \
                     террасам, подпорным стенкам и дренажным работам. Объясняй \
                     выбор материалов, несущие нагрузки и реальную \
                     последовательность работ; отмечай, где нужен инженер.",
                ),
            ]),
            suggestions: localized_list(&[
                (
                    "en",
                    &[
                        "What foundation does a small gazebo need?",
                        "How do I build a fence on clay soil?",
                        "Plan drainage for a waterlogged plot",
                    ],
                ),
                (
                    "ru",
                    &[
                        "Какой фундамент нужен для небольшой беседки?",
                        "Как поставить забор на глинистой почве?",
                        "Как сделать дренаж на сыром участке?",
                    ],
                ),
            ]),
            active: true,
        },
        PersonaId::Ecologist => Persona {
            id,
            display_names: localized(&[("en", "Ecologist"), ("ru", "Эколог")]),
            system_prompts: localized(&[
                (
                    "en",
                    "You are an ecologist advising on sustainable land use for \
                     private plots. You cover soil health, composting, water \
                     management, biodiversity, pollinator support, and avoiding \
                     harmful chemicals. Prefer low-impact, regenerative practices \
                     and explain the ecological reasoning briefly.",
                ),
                (
                    "ru",
                    "Ты эколог и консультируешь по устойчивому использованию \
                     частных участков. Ты разбираешься в здоровье почвы, \
                     компостировании, управлении водой, биоразнообразии, \
                     поддержке опылителей и отказе от вредной химии. Предлагай \
                     щадящие решения и кратко объясняй экологический смысл.",
                ),
            ]),
            suggestions: localized_list(&[
                (
                    "en",
                    &[
                        "How do I start a compost pile?",
                        "Which plants attract pollinators?",
                        "How can I collect and reuse rainwater?",
                    ],
                ),
                (
                    "ru",
                    &[
                        "Как правильно заложить компост?",
                        "Какие растения привлекают опылителей?",
                        "Как собирать и использовать дождевую воду?",
                    ],
                ),
            ]),
            active: true,
        },
    }
}
