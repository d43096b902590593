//! Description Synthesizer.
//!
//! Renders a [`Snapshot`] into one sentence suitable for speech output:
//!
//! ```text
//! I can see Dog in the top left, Chair in the center and Lamp on the right.
//! ```
//!
//! Sector wording comes from a [`SectorPhrases`] data table rather than
//! control flow, so it can be replaced from configuration.
//!
//! # Example
//!
//! ```rust
//! use vista_perception::describe::{Describer, FALLBACK_DESCRIPTION};
//! use vista_types::Snapshot;
//!
//! let describer = Describer::default();
//! assert_eq!(describer.describe(&Snapshot::empty()), FALLBACK_DESCRIPTION);
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;
use vista_types::{PerceivedEntity, Sector, Snapshot};

/// Sentence returned when nothing was perceived.
pub const FALLBACK_DESCRIPTION: &str = "No objects detected in the current view.";

/// Default number of entities mentioned in a description.
pub const DEFAULT_TOP_N: usize = 3;

/// Built-in English sector phrases.
pub const DEFAULT_PHRASES: [(Sector, &str); 9] = [
    (Sector::Center, "in the center"),
    (Sector::Left, "on the left"),
    (Sector::Right, "on the right"),
    (Sector::Top, "at the top"),
    (Sector::Bottom, "at the bottom"),
    (Sector::TopLeft, "in the top left"),
    (Sector::TopRight, "in the top right"),
    (Sector::BottomLeft, "in the bottom left"),
    (Sector::BottomRight, "in the bottom right"),
];

// ────────────────────────────────────────────────────────────────────────────
// Phrase table
// ────────────────────────────────────────────────────────────────────────────

/// Sector tag → phrase lookup table.
///
/// Serialized as a map keyed by sector tag (`center`, `topLeft`, …). Sectors
/// missing from a deserialized map keep their default phrase; unknown tags
/// are ignored with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct SectorPhrases {
    table: HashMap<Sector, String>,
}

impl SectorPhrases {
    /// Phrase for `sector`, e.g. `"on the left"`.
    pub fn phrase(&self, sector: Sector) -> &str {
        self.table.get(&sector).map(String::as_str).unwrap_or_default()
    }

    /// Replace the phrase for one sector.
    pub fn set(&mut self, sector: Sector, phrase: impl Into<String>) {
        self.table.insert(sector, phrase.into());
    }
}

impl Default for SectorPhrases {
    fn default() -> Self {
        Self {
            table: DEFAULT_PHRASES
                .iter()
                .map(|(sector, phrase)| (*sector, (*phrase).to_string()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for SectorPhrases {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut phrases = SectorPhrases::default();
        for (tag, phrase) in raw {
            match tag.parse::<Sector>() {
                Ok(sector) => phrases.set(sector, phrase),
                Err(e) => warn!(error = %e, "ignoring sector phrase override"),
            }
        }
        phrases
    }
}

impl From<SectorPhrases> for BTreeMap<String, String> {
    fn from(phrases: SectorPhrases) -> Self {
        phrases
            .table
            .into_iter()
            .map(|(sector, phrase)| (sector.tag().to_string(), phrase))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Describer
// ────────────────────────────────────────────────────────────────────────────

/// Renders snapshots into sentences.
#[derive(Debug, Clone)]
pub struct Describer {
    phrases: SectorPhrases,
    top_n: usize,
    include_confidence: bool,
}

impl Describer {
    /// `top_n` is clamped to at least one entity.
    pub fn new(phrases: SectorPhrases, top_n: usize, include_confidence: bool) -> Self {
        Self {
            phrases,
            top_n: top_n.max(1),
            include_confidence,
        }
    }

    /// Describe `snapshot` in one sentence. Never fails.
    ///
    /// Entities are ranked by descending confidence (ties keep snapshot
    /// order) and only the first `top_n` are mentioned.
    pub fn describe(&self, snapshot: &Snapshot) -> String {
        if snapshot.is_empty() {
            return FALLBACK_DESCRIPTION.to_string();
        }

        let mut ranked: Vec<&PerceivedEntity> = snapshot.entities.iter().collect();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let items: Vec<String> = ranked
            .into_iter()
            .take(self.top_n)
            .map(|entity| self.render(entity))
            .collect();

        format!("I can see {}.", join_list(&items))
    }

    fn render(&self, entity: &PerceivedEntity) -> String {
        let phrase = self.phrases.phrase(entity.sector);
        if self.include_confidence {
            format!(
                "{} ({}%) {}",
                entity.label,
                entity.confidence_percent(),
                phrase
            )
        } else {
            format!("{} {}", entity.label, phrase)
        }
    }
}

impl Default for Describer {
    fn default() -> Self {
        Self::new(SectorPhrases::default(), DEFAULT_TOP_N, false)
    }
}

/// Join with English list grammar: `A`, `A and B`, `A, B and C`.
pub fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
