//! Feature Compressor
//!
//! Reduces a deck snapshot to a small, deterministic digest the model can
//! reason over without reading every card line.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::DeckSnapshot;

/// Card types counted in [`FeatureSummary::types`]
const TRACKED_TYPES: &[&str] = &[
    "Artifact",
    "Battle",
    "Creature",
    "Enchantment",
    "Instant",
    "Land",
    "Planeswalker",
    "Sorcery",
];

/// Highest mana value with its own curve bucket; higher values share "7+"
const CURVE_CAP: u32 = 7;

/// Compact deck digest
///
/// Counts are weighted by card quantity. Maps are ordered so serialization
/// is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub card_count: u32,
    pub land_count: u32,
    /// Average mana value of non-land cards, two decimals
    pub average_mana_value: Option<f64>,
    /// Non-land cards per mana value ("0".."6", "7+")
    pub mana_curve: BTreeMap<String, u32>,
    /// Cards per colour letter; "C" for colourless
    pub colors: BTreeMap<String, u32>,
    pub types: BTreeMap<String, u32>,
}

/// Snapshot-to-summary reduction
pub trait FeatureCompressor: Send + Sync {
    fn compress(&self, snapshot: &DeckSnapshot) -> FeatureSummary;
}

/// Default compressor: curve, colour and type counts
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveCompressor;

impl FeatureCompressor for CurveCompressor {
    fn compress(&self, snapshot: &DeckSnapshot) -> FeatureSummary {
        let mut summary = FeatureSummary::default();
        let mut mana_total = 0.0;
        let mut mana_cards = 0u32;

        for card in &snapshot.cards {
            let qty = card.quantity;
            summary.card_count = summary.card_count.saturating_add(qty);

            if card.is_land() {
                summary.land_count = summary.land_count.saturating_add(qty);
            } else if let Some(mv) = card.mana_value.filter(|mv| mv.is_finite() && *mv >= 0.0) {
                mana_total += mv * f64::from(qty);
                mana_cards = mana_cards.saturating_add(qty);
                add_count(&mut summary.mana_curve, curve_bucket(mv), qty);
            }

            let letters: Vec<char> = card
                .colors
                .chars()
                .map(|c| c.to_ascii_uppercase())
                .filter(|c| "WUBRG".contains(*c))
                .collect();
            if letters.is_empty() {
                add_count(&mut summary.colors, "C".to_string(), qty);
            } else {
                for letter in letters {
                    add_count(&mut summary.colors, letter.to_string(), qty);
                }
            }

            if let Some(type_line) = &card.type_line {
                // Types sit before the em dash, subtypes after it
                let supertypes = type_line.split('—').next().unwrap_or_default();
                for word in supertypes.split_whitespace() {
                    if let Some(tracked) = TRACKED_TYPES
                        .iter()
                        .find(|t| t.eq_ignore_ascii_case(word))
                    {
                        add_count(&mut summary.types, (*tracked).to_string(), qty);
                    }
                }
            }
        }

        if mana_cards > 0 {
            let average = mana_total / f64::from(mana_cards);
            summary.average_mana_value = Some((average * 100.0).round() / 100.0);
        }

        summary
    }
}

fn add_count(counts: &mut BTreeMap<String, u32>, key: String, qty: u32) {
    let count = counts.entry(key).or_insert(0);
    *count = count.saturating_add(qty);
}

fn curve_bucket(mana_value: f64) -> String {
    let bucket = mana_value.floor() as u32;
    if bucket >= CURVE_CAP {
        format!("{}+", CURVE_CAP)
    } else {
        bucket.to_string()
    }
}
