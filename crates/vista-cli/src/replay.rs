//! Replay recognizer – feeds recorded recognizer output through the engine.
//!
//! A fixture is a JSON file describing one captured frame and what each
//! recognizer reported for it:
//!
//! ```json
//! {
//!   "frame": { "width": 640, "height": 480 },
//!   "detections": [
//!     { "label": "dog", "confidence": 0.92, "region": { "x": 0.05, "y": 0.4, "width": 0.2, "height": 0.3 } }
//!   ],
//!   "classifications": [ { "label": "park", "confidence": 0.7 } ],
//!   "classifier_delay_ms": 120,
//!   "detector_error": null
//! }
//! ```
//!
//! [`ReplayRecognizer`] implements both [`Detector`] and [`Classifier`]; load
//! a fixture with [`ReplayRecognizer::load`] before each scan.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use vista_perception::{Classifier, Detector};
use vista_types::{Frame, RawResult, RecognizerSource, Region, VistaError};

// ─────────────────────────────────────────────────────────────────────────────
// Fixture format
// ─────────────────────────────────────────────────────────────────────────────

/// Dimensions of the recorded frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    /// Override the buffer length to simulate an undecodable frame.
    #[serde(default)]
    pub bytes: Option<usize>,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            bytes: None,
        }
    }
}

/// One recorded recognizer result. Regions default to the full frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedResult {
    pub label: String,
    pub confidence: f32,
    #[serde(default)]
    pub region: Option<Region>,
}

impl RecordedResult {
    fn into_raw(self, source: RecognizerSource) -> RawResult {
        RawResult {
            label: self.label,
            confidence: self.confidence,
            region: self.region.unwrap_or(Region::FULL_FRAME),
            source,
        }
    }
}

/// A recorded frame and both recognizers' output for it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub frame: FrameSpec,
    pub detections: Vec<RecordedResult>,
    pub classifications: Vec<RecordedResult>,
    pub detector_delay_ms: u64,
    pub classifier_delay_ms: u64,
    /// When set, the detector fails with this message.
    pub detector_error: Option<String>,
    /// When set, the classifier fails with this message.
    pub classifier_error: Option<String>,
}

impl Fixture {
    /// Parse a fixture from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse fixture: {}", e))
    }

    /// Read and parse a fixture file.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read fixture at {}: {}", path.display(), e))?;
        Self::from_json(&raw)
    }

    /// A blank RGB24 frame matching the recorded dimensions.
    pub fn frame(&self) -> Frame {
        let spec = &self.frame;
        match spec.bytes {
            Some(len) => Frame::new(spec.width, spec.height, vec![0u8; len]),
            None => Frame::blank(spec.width, spec.height),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ReplayRecognizer
// ─────────────────────────────────────────────────────────────────────────────

/// Plays back the currently loaded [`Fixture`] as both recognizers.
#[derive(Debug, Default)]
pub struct ReplayRecognizer {
    tape: RwLock<Fixture>,
}

impl ReplayRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded fixture.
    pub fn load(&self, fixture: Fixture) {
        *self.tape.write() = fixture;
    }

    fn take(&self, source: RecognizerSource) -> (u64, Option<String>, Vec<RawResult>) {
        let tape = self.tape.read();
        let (delay, error, recorded) = match source {
            RecognizerSource::Detector => {
                (tape.detector_delay_ms, &tape.detector_error, &tape.detections)
            }
            RecognizerSource::Classifier => (
                tape.classifier_delay_ms,
                &tape.classifier_error,
                &tape.classifications,
            ),
        };
        let results = recorded
            .iter()
            .cloned()
            .map(|r| r.into_raw(source))
            .collect();
        (delay, error.clone(), results)
    }

    async fn play(&self, source: RecognizerSource) -> Result<Vec<RawResult>, VistaError> {
        let (delay_ms, error, results) = self.take(source);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        match error {
            Some(details) => Err(VistaError::Recognizer {
                source_kind: source,
                details,
            }),
            None => Ok(results),
        }
    }
}

#[async_trait]
impl Detector for ReplayRecognizer {
    fn name(&self) -> &str {
        "replay"
    }

    async fn detect(&self, _frame: &Frame) -> Result<Vec<RawResult>, VistaError> {
        self.play(RecognizerSource::Detector).await
    }
}

#[async_trait]
impl Classifier for ReplayRecognizer {
    fn name(&self) -> &str {
        "replay"
    }

    async fn classify(&self, _frame: &Frame) -> Result<Vec<RawResult>, VistaError> {
        self.play(RecognizerSource::Classifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIVING_ROOM: &str = include_str!("../fixtures/living_room.json");

    #[test]
    fn bundled_fixture_parses() {
        let fixture = Fixture::from_json(LIVING_ROOM).expect("fixture");
        assert_eq!(fixture.frame.width, 640);
        assert!(!fixture.detections.is_empty());
        assert!(fixture.frame().validate().is_ok());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let fixture = Fixture::from_json("{}").expect("fixture");
        assert!(fixture.detections.is_empty());
        assert_eq!(fixture.frame.height, 480);
        assert!(fixture.detector_error.is_none());
    }

    #[test]
    fn byte_override_produces_malformed_frame() {
        let fixture =
            Fixture::from_json(r#"{"frame": {"width": 4, "height": 4, "bytes": 5}}"#).unwrap();
        assert!(fixture.frame().validate().is_err());
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = Fixture::from_json("{not json").unwrap_err();
        assert!(err.contains("Failed to parse fixture"));
    }

    #[tokio::test]
    async fn replay_tags_results_with_their_source() {
        let replay = ReplayRecognizer::new();
        replay.load(
            Fixture::from_json(
                r#"{"detections": [{"label": "dog", "confidence": 0.9}],
                    "classifications": [{"label": "park", "confidence": 0.8}]}"#,
            )
            .unwrap(),
        );
        let frame = Frame::blank(2, 2);

        let detected = replay.detect(&frame).await.unwrap();
        assert_eq!(detected[0].source, RecognizerSource::Detector);
        assert_eq!(detected[0].region, Region::FULL_FRAME);

        let classified = replay.classify(&frame).await.unwrap();
        assert_eq!(classified[0].label, "park");
        assert_eq!(classified[0].source, RecognizerSource::Classifier);
    }

    #[tokio::test]
    async fn recorded_error_fails_only_that_branch() {
        let replay = ReplayRecognizer::new();
        replay.load(
            Fixture::from_json(
                r#"{"classifications": [{"label": "park", "confidence": 0.8}],
                    "detector_error": "camera model not loaded"}"#,
            )
            .unwrap(),
        );
        let frame = Frame::blank(2, 2);
        assert!(matches!(
            replay.detect(&frame).await,
            Err(VistaError::Recognizer { source_kind: RecognizerSource::Detector, .. })
        ));
        assert_eq!(replay.classify(&frame).await.unwrap().len(), 1);
    }
}
