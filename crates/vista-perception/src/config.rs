//! Tunable thresholds and caps for the perception pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vista_types::VistaError;

use crate::describe::{DEFAULT_TOP_N, Describer, SectorPhrases};

/// Configuration consumed by the dispatcher, fusion and synthesizer.
///
/// Every field has a default, so a partial TOML table is enough:
///
/// ```rust
/// use vista_perception::config::PerceptionConfig;
///
/// let cfg: PerceptionConfig = toml::from_str("snapshot_cap = 8").unwrap();
/// assert_eq!(cfg.snapshot_cap, 8);
/// assert_eq!(cfg.detector_confidence_floor, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Detector results must score strictly above this.
    pub detector_confidence_floor: f32,
    /// Classifier results must score strictly above this.
    pub classifier_confidence_floor: f32,
    /// How many top classifier candidates are considered at all.
    pub classifier_candidate_cap: usize,
    /// Maximum entities kept in a fused snapshot.
    pub snapshot_cap: usize,
    /// Entities mentioned in a description.
    pub description_top_n: usize,
    /// Per-recognizer deadline in milliseconds. `0` waits indefinitely.
    pub branch_timeout_ms: u64,
    /// Append `(NN%)` after each label in descriptions.
    pub include_confidence: bool,
    /// Sector tag → phrase table.
    pub phrases: SectorPhrases,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            detector_confidence_floor: 0.5,
            classifier_confidence_floor: 0.3,
            classifier_candidate_cap: 3,
            snapshot_cap: 5,
            description_top_n: DEFAULT_TOP_N,
            branch_timeout_ms: 3_000,
            include_confidence: false,
            phrases: SectorPhrases::default(),
        }
    }
}

impl PerceptionConfig {
    /// The per-branch deadline, or `None` when disabled.
    pub fn branch_timeout(&self) -> Option<Duration> {
        (self.branch_timeout_ms > 0).then(|| Duration::from_millis(self.branch_timeout_ms))
    }

    /// Build a [`Describer`] from the description settings.
    pub fn describer(&self) -> Describer {
        Describer::new(
            self.phrases.clone(),
            self.description_top_n,
            self.include_confidence,
        )
    }

    /// Reject values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`VistaError::Config`] when a floor lies outside `[0, 1]` or a
    /// cap is zero.
    pub fn validate(&self) -> Result<(), VistaError> {
        for (name, floor) in [
            ("detector_confidence_floor", self.detector_confidence_floor),
            ("classifier_confidence_floor", self.classifier_confidence_floor),
        ] {
            if !(0.0..=1.0).contains(&floor) {
                return Err(VistaError::Config(format!(
                    "{name} must lie in [0, 1], got {floor}"
                )));
            }
        }
        for (name, cap) in [
            ("classifier_candidate_cap", self.classifier_candidate_cap),
            ("snapshot_cap", self.snapshot_cap),
            ("description_top_n", self.description_top_n),
        ] {
            if cap == 0 {
                return Err(VistaError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}
