//! Prompt Builder
//!
//! Renders the instruction, schema and deck data sections of a model
//! request. Output is a pure function of its inputs, and its rendered size
//! never exceeds the configured maximum while any card is retained: cards
//! are dropped from the low-priority end (highest position) until it fits.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::feature_compressor::FeatureSummary;
use crate::models::analysis::ARCHETYPE_VOCABULARY;
use crate::models::{DeckCard, DeckSnapshot, ANALYSIS_SCHEMA};

/// Smallest accepted `max_prompt_chars`
///
/// Leaves room for the fixed sections plus at least a few card lines.
pub const MIN_PROMPT_CHARS: usize = 4000;

const DECK_NAME_LIMIT: usize = 100;
const CARD_NAME_LIMIT: usize = 80;
const TYPE_LINE_LIMIT: usize = 60;

const INSTRUCTIONS: &str = "You are an expert Magic: The Gathering deck analyst. \
Assess the deck described by the user and answer with a single JSON object \
and nothing else. Use exactly the keys listed in the output schema, respect \
every bound, and pick enumeration values only from the listed options. \
Judge the deck as written; do not suggest card changes. Include a \
\"confidence\" number expressing how sure you are given the data shown.";

/// One fully rendered model request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System prompt
    pub instructions: String,
    pub schema_description: String,
    /// Deck header plus one line per retained card
    pub deck_excerpt: String,
    /// Serialized [`FeatureSummary`]
    pub features: String,
    pub retained_cards: usize,
    pub total_cards: usize,
}

impl GenerationRequest {
    /// User prompt (everything except the instructions)
    pub fn user_prompt(&self) -> String {
        format!(
            "OUTPUT SCHEMA\n{}\nDECK FEATURES\n{}\n\nDECK\n{}",
            self.schema_description, self.features, self.deck_excerpt
        )
    }

    /// Size in characters of system plus user prompt
    pub fn rendered_len(&self) -> usize {
        self.instructions.chars().count() + self.user_prompt().chars().count()
    }

    pub fn is_truncated(&self) -> bool {
        self.retained_cards < self.total_cards
    }

    /// Share of card lines the model actually saw, when some were dropped
    pub fn coverage(&self) -> Option<f64> {
        if self.is_truncated() && self.total_cards > 0 {
            Some(self.retained_cards as f64 / self.total_cards as f64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_prompt_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_prompt_chars: usize) -> Self {
        Self {
            max_prompt_chars: max_prompt_chars.max(MIN_PROMPT_CHARS),
        }
    }

    pub fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    pub fn build(&self, snapshot: &DeckSnapshot, features: &FeatureSummary) -> GenerationRequest {
        let schema_description = schema_description();
        // BTreeMap fields serialize in key order
        let features = serde_json::to_string(features).unwrap_or_else(|_| "{}".to_string());
        let lines: Vec<String> = snapshot.cards.iter().map(card_line).collect();
        let total = lines.len();

        let render = |retained: usize| GenerationRequest {
            instructions: INSTRUCTIONS.to_string(),
            schema_description: schema_description.clone(),
            deck_excerpt: deck_excerpt(snapshot, &lines[..retained], total),
            features: features.clone(),
            retained_cards: retained,
            total_cards: total,
        };

        let full = render(total);
        if total == 0 || full.rendered_len() <= self.max_prompt_chars {
            return self.checked(full);
        }

        // Truncated size grows by each kept line (and newline) on top of the
        // zero-card render; only the header count's width varies.
        let empty_len = render(0).rendered_len();
        let mut retained = 0;
        let mut lines_len = 0;
        for (i, line) in lines.iter().enumerate().take(total - 1) {
            let kept = i + 1;
            lines_len += line.chars().count() + 1;
            if empty_len + digits(kept) - 1 + lines_len > self.max_prompt_chars {
                break;
            }
            retained = kept;
        }

        self.checked(render(retained))
    }

    fn checked(&self, request: GenerationRequest) -> GenerationRequest {
        if request.rendered_len() > self.max_prompt_chars {
            warn!(
                rendered_len = request.rendered_len(),
                max_prompt_chars = self.max_prompt_chars,
                "Prompt exceeds limit with no card lines"
            );
        }
        request
    }
}

fn digits(n: usize) -> usize {
    n.to_string().len()
}

/// Output contract listing every field with its type, bounds and options
pub fn schema_description() -> String {
    let mut out = String::new();
    for field in ANALYSIS_SCHEMA {
        out.push_str(&format!(
            "- \"{}\": {} ({})\n",
            field.name,
            field.kind.describe(),
            field.hint
        ));
    }
    out.push_str(&format!(
        "Suggested archetypes: {}\n",
        ARCHETYPE_VOCABULARY.join(", ")
    ));
    out
}

fn deck_excerpt(snapshot: &DeckSnapshot, lines: &[String], total: usize) -> String {
    let deck = &snapshot.deck;
    let mut out = format!(
        "Name: {}\nFormat: {}\n",
        clip(&deck.name, DECK_NAME_LIMIT),
        deck.format.as_deref().map(|f| clip(f, DECK_NAME_LIMIT)).unwrap_or_else(|| "unknown".to_string())
    );
    if lines.len() < total {
        out.push_str(&format!("Main board (first {} of {} lines):\n", lines.len(), total));
    } else {
        out.push_str(&format!("Main board ({} lines):\n", total));
    }
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn card_line(card: &DeckCard) -> String {
    let mut line = format!("{}x {}", card.quantity, clip(&card.name, CARD_NAME_LIMIT));
    if let Some(type_line) = &card.type_line {
        line.push_str(" | ");
        line.push_str(&clip(type_line, TYPE_LINE_LIMIT));
    }
    if let Some(mv) = card.mana_value {
        line.push_str(&format!(" | mv {}", mv));
    }
    if !card.colors.is_empty() {
        line.push_str(" | ");
        line.push_str(&clip(&card.colors, 5));
    }
    line
}

fn clip(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Board, Deck};
    use crate::services::feature_compressor::{CurveCompressor, FeatureCompressor};

    fn snapshot(card_count: u32) -> DeckSnapshot {
        DeckSnapshot {
            deck: Deck {
                id: "D1".to_string(),
                owner_id: "U1".to_string(),
                name: "Big Deck".to_string(),
                format: Some("commander".to_string()),
            },
            cards: (0..card_count)
                .map(|i| DeckCard {
                    position: i,
                    name: format!("Card Number {:04} With A Fairly Long Name", i),
                    quantity: 1,
                    board: Board::Main,
                    mana_value: Some(f64::from(i % 7)),
                    type_line: Some("Creature — Human Wizard".to_string()),
                    colors: "U".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_small_deck_not_truncated() {
        let snap = snapshot(10);
        let request = PromptBuilder::new(12_000).build(&snap, &CurveCompressor.compress(&snap));
        assert_eq!(request.retained_cards, 10);
        assert!(!request.is_truncated());
        assert_eq!(request.coverage(), None);
        assert!(request.deck_excerpt.contains("Card Number 0009"));
    }

    #[test]
    fn test_truncation_keeps_priority_prefix_within_limit() {
        let snap = snapshot(400);
        let builder = PromptBuilder::new(MIN_PROMPT_CHARS * 2);
        let request = builder.build(&snap, &CurveCompressor.compress(&snap));

        assert!(request.rendered_len() <= builder.max_prompt_chars());
        assert!(request.is_truncated());
        assert!(request.retained_cards > 0);

        let listed: Vec<&str> = request
            .deck_excerpt
            .lines()
            .filter(|l| l.contains("Card Number"))
            .collect();
        assert_eq!(listed.len(), request.retained_cards);
        for (i, line) in listed.iter().enumerate() {
            assert!(line.contains(&format!("Card Number {:04}", i)), "{}", line);
        }

        // Greedy: one more card would not have fit
        let one_more = GenerationRequest {
            deck_excerpt: deck_excerpt(
                &snap,
                &snap.cards[..=request.retained_cards].iter().map(card_line).collect::<Vec<_>>(),
                400,
            ),
            ..request.clone()
        };
        assert!(one_more.rendered_len() > builder.max_prompt_chars());
    }

    /// One card at a time from the tail until the render fits
    fn greedy_retained(snap: &DeckSnapshot, features: &FeatureSummary, max: usize) -> usize {
        let lines: Vec<String> = snap.cards.iter().map(card_line).collect();
        let total = lines.len();
        let mut retained = total;
        loop {
            let request = GenerationRequest {
                instructions: INSTRUCTIONS.to_string(),
                schema_description: schema_description(),
                deck_excerpt: deck_excerpt(snap, &lines[..retained], total),
                features: serde_json::to_string(features).unwrap(),
                retained_cards: retained,
                total_cards: total,
            };
            if request.rendered_len() <= max || retained == 0 {
                return retained;
            }
            retained -= 1;
        }
    }

    #[test]
    fn test_truncation_matches_one_by_one_reference() {
        let snap = snapshot(400);
        let features = CurveCompressor.compress(&snap);
        for max in [MIN_PROMPT_CHARS, 6_000, 9_000, 20_000, 40_000] {
            let builder = PromptBuilder::new(max);
            let request = builder.build(&snap, &features);
            assert_eq!(request.retained_cards, greedy_retained(&snap, &features, max), "max={}", max);
            assert!(request.rendered_len() <= max);
        }
    }

    #[test]
    fn test_truncation_of_very_large_deck() {
        let snap = snapshot(9_000);
        let builder = PromptBuilder::new(MIN_PROMPT_CHARS * 3);
        let request = builder.build(&snap, &CurveCompressor.compress(&snap));

        assert_eq!(request.total_cards, 9_000);
        assert!(request.retained_cards > 0);
        assert!(request.rendered_len() <= builder.max_prompt_chars());
        assert!(request.deck_excerpt.contains(&format!(
            "first {} of 9000 lines",
            request.retained_cards
        )));
        let last_kept = format!("Card Number {:04}", request.retained_cards - 1);
        let first_dropped = format!("Card Number {:04}", request.retained_cards);
        assert!(request.deck_excerpt.contains(&last_kept));
        assert!(!request.deck_excerpt.contains(&first_dropped));
    }

    #[test]
    fn test_build_is_deterministic() {
        let snap = snapshot(50);
        let features = CurveCompressor.compress(&snap);
        let builder = PromptBuilder::new(6000);
        assert_eq!(builder.build(&snap, &features), builder.build(&snap, &features));
    }

    #[test]
    fn test_schema_description_lists_every_field() {
        let description = schema_description();
        for field in ANALYSIS_SCHEMA {
            assert!(description.contains(&format!("\"{}\"", field.name)));
        }
        assert!(description.contains("\"Low\", \"Medium\", \"High\""));
        assert!(description.contains("integer from 1 to 10"));
    }

    #[test]
    fn test_limit_floor() {
        assert_eq!(PromptBuilder::new(10).max_prompt_chars(), MIN_PROMPT_CHARS);
    }
}
