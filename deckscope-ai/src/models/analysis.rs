//! Structured deck analysis (the only persisted artifact)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::{FieldKind, FieldSpec};

/// Version tag stored with every analysis row
pub const SCHEMA_VERSION: &str = "deck-analysis/v1";

pub const POWER_LEVEL_MIN: i64 = 1;
pub const POWER_LEVEL_MAX: i64 = 10;
pub const DEFAULT_POWER_LEVEL: i64 = 5;
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

const LEVELS: &[&str] = &["Low", "Medium", "High"];

/// Suggested archetype vocabulary (listed in the prompt, not enforced)
pub const ARCHETYPE_VOCABULARY: &[&str] = &[
    "Aggro", "Midrange", "Control", "Combo", "Tempo", "Ramp", "Tokens", "Aristocrats",
    "Voltron", "Stax", "Spellslinger", "Tribal", "Reanimator", "Mill", "Burn", "Lifegain",
    "Landfall", "Artifacts", "Enchantress", "Group Hug",
];

/// Declared output contract, in prompt order
pub const ANALYSIS_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "summary",
        kind: FieldKind::Text { max_chars: 600 },
        hint: "two to four sentences on how the deck plans to win",
    },
    FieldSpec {
        name: "archetypes",
        kind: FieldKind::TextList { max_items: 4, max_chars: 40 },
        hint: "archetype tags, preferably from the published vocabulary",
    },
    FieldSpec {
        name: "strengths",
        kind: FieldKind::TextList { max_items: 5, max_chars: 160 },
        hint: "short phrases",
    },
    FieldSpec {
        name: "weaknesses",
        kind: FieldKind::TextList { max_items: 5, max_chars: 160 },
        hint: "short phrases",
    },
    FieldSpec {
        name: "power_level",
        kind: FieldKind::Integer {
            min: POWER_LEVEL_MIN,
            max: POWER_LEVEL_MAX,
            default: DEFAULT_POWER_LEVEL,
        },
        hint: "overall strength, 1 = precon-level casual, 10 = competitive",
    },
    FieldSpec {
        name: "speed",
        kind: FieldKind::Choice { options: LEVELS, default: "Medium" },
        hint: "how fast the deck threatens to win",
    },
    FieldSpec {
        name: "speed_explanation",
        kind: FieldKind::Text { max_chars: 280 },
        hint: "one sentence justifying speed",
    },
    FieldSpec {
        name: "interaction",
        kind: FieldKind::Choice { options: LEVELS, default: "Medium" },
        hint: "removal, counterspells and disruption density",
    },
    FieldSpec {
        name: "interaction_explanation",
        kind: FieldKind::Text { max_chars: 280 },
        hint: "one sentence justifying interaction",
    },
    FieldSpec {
        name: "complexity",
        kind: FieldKind::Choice { options: LEVELS, default: "Medium" },
        hint: "how hard the deck is to pilot",
    },
    FieldSpec {
        name: "complexity_explanation",
        kind: FieldKind::Text { max_chars: 280 },
        hint: "one sentence justifying complexity",
    },
    FieldSpec {
        name: "resilience",
        kind: FieldKind::Choice { options: LEVELS, default: "Medium" },
        hint: "ability to recover from removal and board wipes",
    },
    FieldSpec {
        name: "resilience_explanation",
        kind: FieldKind::Text { max_chars: 280 },
        hint: "one sentence justifying resilience",
    },
    FieldSpec {
        name: "confidence",
        kind: FieldKind::Probability { default: DEFAULT_CONFIDENCE },
        hint: "your confidence in this assessment",
    },
];

/// Categorical axis value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

/// Schema-conformant analysis result
///
/// Field names and bounds match [`ANALYSIS_SCHEMA`]; values are only ever
/// produced by the result normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckAnalysis {
    pub summary: String,
    pub archetypes: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub power_level: u8,
    pub speed: Level,
    pub speed_explanation: String,
    pub interaction: Level,
    pub interaction_explanation: String,
    pub complexity: Level,
    pub complexity_explanation: String,
    pub resilience: Level,
    pub resilience_explanation: String,
    pub confidence: f64,
}

impl Default for DeckAnalysis {
    /// Result of normalizing an empty object
    fn default() -> Self {
        Self {
            summary: String::new(),
            archetypes: Vec::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            power_level: DEFAULT_POWER_LEVEL as u8,
            speed: Level::Medium,
            speed_explanation: String::new(),
            interaction: Level::Medium,
            interaction_explanation: String::new(),
            complexity: Level::Medium,
            complexity_explanation: String::new(),
            resilience: Level::Medium,
            resilience_explanation: String::new(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Stored analysis row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAnalysis {
    pub deck_id: String,
    pub schema_version: String,
    /// Model identifier that produced the result
    pub model: String,
    pub generated_at: DateTime<Utc>,
    pub result: DeckAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_names_unique_and_match_struct() {
        let names: HashSet<_> = ANALYSIS_SCHEMA.iter().map(|f| f.name).collect();
        assert_eq!(names.len(), ANALYSIS_SCHEMA.len());

        let encoded = serde_json::to_value(DeckAnalysis::default()).unwrap();
        let keys: HashSet<_> = encoded.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, keys);
    }

    #[test]
    fn test_level_options_match_serde() {
        for option in LEVELS {
            let parsed: Level = serde_json::from_value(serde_json::json!(option)).unwrap();
            assert_eq!(serde_json::to_value(parsed).unwrap(), serde_json::json!(option));
        }
    }

    #[test]
    fn test_choice_defaults_are_members() {
        for field in ANALYSIS_SCHEMA {
            if let FieldKind::Choice { options, default } = field.kind {
                assert!(options.contains(&default), "{}", field.name);
            }
            if let FieldKind::Integer { min, max, default } = field.kind {
                assert!((min..=max).contains(&default), "{}", field.name);
            }
        }
    }
}
