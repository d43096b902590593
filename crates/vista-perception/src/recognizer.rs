//! Recognizer Interface.
//!
//! The perception engine never runs a model itself. It talks to two opaque
//! backends through these traits: an object [`Detector`] that localizes
//! instances, and an image [`Classifier`] that labels the frame as a whole.
//!
//! # Contract
//!
//! * Both calls must be safe to invoke concurrently from different tasks.
//! * The frame is borrowed immutably; implementations must not mutate it.
//! * Errors are allowed; the dispatcher turns them into "no results".
//! * A detector reports alternative labels for one instance as several
//!   [`RawResult`]s sharing the exact same region.

use async_trait::async_trait;
use vista_types::{Frame, RawResult, VistaError};

/// Object detector backend.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Stable identifier for logging, e.g. `"yolov8n"`.
    fn name(&self) -> &str;

    /// Detect objects in `frame`.
    async fn detect(&self, frame: &Frame) -> Result<Vec<RawResult>, VistaError>;
}

/// Whole-image classifier backend.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Stable identifier for logging, e.g. `"mobilenet_v3"`.
    fn name(&self) -> &str;

    /// Classify `frame`. Regions in the output are ignored.
    async fn classify(&self, frame: &Frame) -> Result<Vec<RawResult>, VistaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_types::{RecognizerSource, Region};

    struct MockDetector;

    #[async_trait]
    impl Detector for MockDetector {
        fn name(&self) -> &str {
            "mock"
        }

        async fn detect(&self, frame: &Frame) -> Result<Vec<RawResult>, VistaError> {
            frame.validate()?;
            Ok(vec![RawResult {
                label: "dog".to_string(),
                confidence: 0.9,
                region: Region::new(0.1, 0.1, 0.2, 0.2),
                source: RecognizerSource::Detector,
            }])
        }
    }

    #[tokio::test]
    async fn mock_detector_detect() {
        let detector = MockDetector;
        assert_eq!(detector.name(), "mock");
        let results = detector.detect(&Frame::blank(2, 2)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "dog");
    }

    #[tokio::test]
    async fn mock_detector_propagates_frame_errors() {
        let detector = MockDetector;
        let result = detector.detect(&Frame::new(2, 2, vec![0; 5])).await;
        assert!(matches!(result, Err(VistaError::MalformedFrame(_))));
    }
}
