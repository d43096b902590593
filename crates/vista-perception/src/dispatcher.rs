//! Fan-In Dispatcher.
//!
//! Runs the [`Detector`] and [`Classifier`] concurrently over one frame,
//! waits for **both** to report, and thresholds their output into two lists
//! of [`PerceivedEntity`].
//!
//! ```text
//!            ┌─► detect()   ─► timeout ─► accept_detections()      ─┐
//! frame ─────┤                                                       ├─► Dispatched
//!            └─► classify() ─► timeout ─► accept_classifications() ─┘
//! ```
//!
//! Each branch is a separate Tokio task. A branch that errors, panics or
//! misses its deadline contributes an empty list and is reported in
//! [`Dispatched::degraded`]; the join itself never fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vista_types::{Frame, PerceivedEntity, RawResult, RecognizerSource, Region, VistaError};

use crate::config::PerceptionConfig;
use crate::label::normalize;
use crate::recognizer::{Classifier, Detector};
use crate::sector::sector_of;

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// Thresholded output of both recognizer branches.
#[derive(Debug, Clone, Default)]
pub struct Dispatched {
    /// Accepted detector entities, by descending confidence.
    pub detections: Vec<PerceivedEntity>,
    /// Accepted classifier entities, by descending confidence, full-frame.
    pub classifications: Vec<PerceivedEntity>,
    /// Branches that contributed nothing because they failed.
    pub degraded: Vec<(RecognizerSource, VistaError)>,
}

// ────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ────────────────────────────────────────────────────────────────────────────

/// Launches both recognizers and joins them.
pub struct FanInDispatcher {
    detector: Arc<dyn Detector>,
    classifier: Arc<dyn Classifier>,
    detector_floor: f32,
    classifier_floor: f32,
    classifier_cap: usize,
    branch_timeout: Option<Duration>,
}

impl FanInDispatcher {
    pub fn new(
        detector: Arc<dyn Detector>,
        classifier: Arc<dyn Classifier>,
        config: &PerceptionConfig,
    ) -> Self {
        Self {
            detector,
            classifier,
            detector_floor: config.detector_confidence_floor,
            classifier_floor: config.classifier_confidence_floor,
            classifier_cap: config.classifier_candidate_cap,
            branch_timeout: config.branch_timeout(),
        }
    }

    /// Run both recognizers over `frame` and wait for both to settle.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn dispatch(&self, frame: Arc<Frame>) -> Dispatched {
        let detector = Arc::clone(&self.detector);
        let detector_frame = Arc::clone(&frame);
        let detect_task = tokio::spawn(async move { detector.detect(&detector_frame).await });

        let classifier = Arc::clone(&self.classifier);
        let classifier_frame = Arc::clone(&frame);
        let classify_task =
            tokio::spawn(async move { classifier.classify(&classifier_frame).await });

        let (detected, classified) = tokio::join!(
            join_branch(RecognizerSource::Detector, detect_task, self.branch_timeout),
            join_branch(RecognizerSource::Classifier, classify_task, self.branch_timeout),
        );

        let mut degraded = Vec::new();
        let raw_detections = settle(
            RecognizerSource::Detector,
            self.detector.name(),
            detected,
            &mut degraded,
        );
        let raw_classifications = settle(
            RecognizerSource::Classifier,
            self.classifier.name(),
            classified,
            &mut degraded,
        );

        let detections = accept_detections(raw_detections, self.detector_floor);
        let classifications = accept_classifications(
            raw_classifications,
            self.classifier_cap,
            self.classifier_floor,
        );
        debug!(
            detections = detections.len(),
            classifications = classifications.len(),
            degraded = degraded.len(),
            "recognizer branches joined"
        );

        Dispatched {
            detections,
            classifications,
            degraded,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Thresholding
// ────────────────────────────────────────────────────────────────────────────

/// Keep the best label per detected instance, then keep those scoring
/// strictly above `floor`. Output is sorted by descending confidence.
///
/// Results whose regions are bit-identical belong to the same instance.
/// Results without a speakable label are discarded first.
pub fn accept_detections(raw: Vec<RawResult>, floor: f32) -> Vec<PerceivedEntity> {
    let mut best_per_instance: Vec<RawResult> = Vec::new();
    for result in raw.into_iter().filter(is_usable) {
        match best_per_instance
            .iter_mut()
            .find(|best| best.region.same_instance(&result.region))
        {
            Some(best) if result.confidence > best.confidence => *best = result,
            Some(_) => {}
            None => best_per_instance.push(result),
        }
    }

    let mut accepted: Vec<PerceivedEntity> = best_per_instance
        .into_iter()
        .filter(|r| r.confidence > floor)
        .map(|r| {
            let region = r.region;
            to_entity(r, region)
        })
        .collect();
    accepted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    accepted
}

/// Take the `cap` highest-scoring candidates, then keep those strictly above
/// `floor`. Every accepted entity covers the full frame.
pub fn accept_classifications(
    mut raw: Vec<RawResult>,
    cap: usize,
    floor: f32,
) -> Vec<PerceivedEntity> {
    raw.retain(is_usable);
    raw.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    raw.into_iter()
        .take(cap)
        .filter(|r| r.confidence > floor)
        .map(|r| to_entity(r, Region::FULL_FRAME))
        .collect()
}

/// Finite score and a label that does not normalize to blank. A blank label
/// would be contained in every other label during fusion.
fn is_usable(raw: &RawResult) -> bool {
    raw.confidence.is_finite() && !normalize(&raw.label).trim().is_empty()
}

fn to_entity(raw: RawResult, region: Region) -> PerceivedEntity {
    PerceivedEntity {
        label: normalize(&raw.label),
        confidence: raw.confidence,
        region,
        sector: sector_of(&region),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

async fn join_branch(
    source: RecognizerSource,
    mut task: JoinHandle<Result<Vec<RawResult>, VistaError>>,
    timeout: Option<Duration>,
) -> Result<Vec<RawResult>, VistaError> {
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                return Err(VistaError::Timeout {
                    source_kind: source,
                    millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
        },
        None => task.await,
    };

    joined.unwrap_or_else(|e| {
        Err(VistaError::Recognizer {
            source_kind: source,
            details: format!("recognizer task aborted: {e}"),
        })
    })
}

fn settle(
    source: RecognizerSource,
    name: &str,
    outcome: Result<Vec<RawResult>, VistaError>,
    degraded: &mut Vec<(RecognizerSource, VistaError)>,
) -> Vec<RawResult> {
    match outcome {
        Ok(results) => {
            debug!(%source, recognizer = name, raw = results.len(), "branch completed");
            results
        }
        Err(e) => {
            warn!(%source, recognizer = name, error = %e, "branch degraded to empty result");
            degraded.push((source, e));
            Vec::new()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vista_types::Sector;

    fn det(label: &str, confidence: f32, region: Region) -> RawResult {
        RawResult {
            label: label.to_string(),
            confidence,
            region,
            source: RecognizerSource::Detector,
        }
    }

    fn cls(label: &str, confidence: f32) -> RawResult {
        RawResult {
            label: label.to_string(),
            confidence,
            region: Region::new(0.0, 0.0, 0.1, 0.1),
            source: RecognizerSource::Classifier,
        }
    }

    enum Behaviour {
        Results(Vec<RawResult>),
        Delayed(u64, Vec<RawResult>),
        Fail,
        Panic,
        Hang,
    }

    struct Scripted(Behaviour);

    impl Scripted {
        async fn run(&self) -> Result<Vec<RawResult>, VistaError> {
            match &self.0 {
                Behaviour::Results(r) => Ok(r.clone()),
                Behaviour::Delayed(ms, r) => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                    Ok(r.clone())
                }
                Behaviour::Fail => Err(VistaError::Recognizer {
                    source_kind: RecognizerSource::Detector,
                    details: "backend offline".to_string(),
                }),
                Behaviour::Panic => panic!("model crashed"),
                Behaviour::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl Detector for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<RawResult>, VistaError> {
            self.run().await
        }
    }

    #[async_trait]
    impl Classifier for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn classify(&self, _frame: &Frame) -> Result<Vec<RawResult>, VistaError> {
            self.run().await
        }
    }

    fn dispatcher(detector: Behaviour, classifier: Behaviour, timeout_ms: u64) -> FanInDispatcher {
        let config = PerceptionConfig {
            branch_timeout_ms: timeout_ms,
            ..PerceptionConfig::default()
        };
        FanInDispatcher::new(
            Arc::new(Scripted(detector)),
            Arc::new(Scripted(classifier)),
            &config,
        )
    }

    fn frame() -> Arc<Frame> {
        Arc::new(Frame::blank(4, 4))
    }

    // ── thresholding ──────────────────────────────────────────────────────

    #[test]
    fn detector_floor_is_exclusive() {
        let a = Region::new(0.0, 0.0, 0.1, 0.1);
        let b = Region::new(0.5, 0.5, 0.1, 0.1);
        let accepted = accept_detections(vec![det("at", 0.5, a), det("above", 0.5001, b)], 0.5);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].label, "Above");
    }

    #[test]
    fn classifier_floor_is_exclusive() {
        let accepted = accept_classifications(vec![cls("at", 0.3), cls("above", 0.3001)], 3, 0.3);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].label, "Above");
    }

    #[test]
    fn detector_keeps_best_label_per_instance() {
        let region = Region::new(0.0, 0.8, 0.2, 0.2);
        let accepted = accept_detections(
            vec![
                det("dog", 0.7, region),
                det("golden_retriever", 0.9, region),
                det("wolf", 0.6, region),
            ],
            0.5,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].label, "Golden Retriever");
        assert_eq!(accepted[0].sector, Sector::TopLeft);
    }

    #[test]
    fn detections_sorted_by_descending_confidence() {
        let accepted = accept_detections(
            vec![
                det("chair", 0.6, Region::new(0.0, 0.0, 0.1, 0.1)),
                det("table", 0.95, Region::new(0.4, 0.4, 0.2, 0.2)),
                det("lamp", 0.8, Region::new(0.8, 0.4, 0.1, 0.1)),
            ],
            0.5,
        );
        let labels: Vec<_> = accepted.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Table", "Lamp", "Chair"]);
    }

    #[test]
    fn classifier_caps_before_thresholding() {
        let accepted = accept_classifications(
            vec![cls("d", 0.6), cls("a", 0.9), cls("c", 0.7), cls("b", 0.8)],
            3,
            0.3,
        );
        let labels: Vec<_> = accepted.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn classifier_results_cover_full_frame() {
        let accepted = accept_classifications(vec![cls("kitchen", 0.8)], 3, 0.3);
        assert_eq!(accepted[0].region, Region::FULL_FRAME);
        assert_eq!(accepted[0].sector, Sector::Center);
    }

    #[test]
    fn non_finite_scores_are_discarded() {
        let accepted = accept_classifications(vec![cls("ghost", f32::NAN), cls("room", 0.5)], 1, 0.3);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].label, "Room");
    }

    // ── fan-in ────────────────────────────────────────────────────────────

    #[test]
    fn blank_labels_are_discarded() {
        let region = Region::new(0.1, 0.1, 0.2, 0.2);
        let accepted = accept_detections(
            vec![det("", 0.95, region), det("_", 0.9, region), det("dog", 0.8, region)],
            0.5,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].label, "Dog");

        let accepted = accept_classifications(
            vec![cls(" - ", 0.9), cls("", 0.8), cls("park", 0.7)],
            3,
            0.3,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].label, "Park");
    }

    #[tokio::test]
    async fn both_branches_are_joined() {
        let d = dispatcher(
            Behaviour::Results(vec![det("dog", 0.9, Region::new(0.1, 0.4, 0.1, 0.1))]),
            Behaviour::Results(vec![cls("park", 0.8)]),
            1_000,
        );
        let out = d.dispatch(frame()).await;
        assert_eq!(out.detections.len(), 1);
        assert_eq!(out.classifications.len(), 1);
        assert!(out.degraded.is_empty());
    }

    #[tokio::test]
    async fn failing_branch_degrades_to_empty() {
        let d = dispatcher(Behaviour::Fail, Behaviour::Results(vec![cls("park", 0.8)]), 1_000);
        let out = d.dispatch(frame()).await;
        assert!(out.detections.is_empty());
        assert_eq!(out.classifications.len(), 1);
        assert_eq!(out.degraded.len(), 1);
        assert_eq!(out.degraded[0].0, RecognizerSource::Detector);
    }

    #[tokio::test]
    async fn panicking_branch_degrades_to_empty() {
        let d = dispatcher(
            Behaviour::Results(vec![det("dog", 0.9, Region::FULL_FRAME)]),
            Behaviour::Panic,
            1_000,
        );
        let out = d.dispatch(frame()).await;
        assert_eq!(out.detections.len(), 1);
        assert!(out.classifications.is_empty());
        assert_eq!(out.degraded[0].0, RecognizerSource::Classifier);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_branch_times_out() {
        let d = dispatcher(Behaviour::Hang, Behaviour::Results(vec![cls("park", 0.8)]), 50);
        let out = d.dispatch(frame()).await;
        assert!(out.detections.is_empty());
        assert_eq!(out.classifications.len(), 1);
        assert!(matches!(
            out.degraded[0].1,
            VistaError::Timeout { source_kind: RecognizerSource::Detector, millis: 50 }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_order_does_not_change_output() {
        let detections = vec![
            det("dog", 0.9, Region::new(0.1, 0.4, 0.1, 0.1)),
            det("ball", 0.7, Region::new(0.7, 0.1, 0.1, 0.1)),
        ];
        let classifications = vec![cls("park", 0.8), cls("grass", 0.6)];

        let slow_detector = dispatcher(
            Behaviour::Delayed(200, detections.clone()),
            Behaviour::Results(classifications.clone()),
            0,
        );
        let slow_classifier = dispatcher(
            Behaviour::Results(detections),
            Behaviour::Delayed(200, classifications),
            0,
        );

        let a = slow_detector.dispatch(frame()).await;
        let b = slow_classifier.dispatch(frame()).await;
        assert_eq!(a.detections, b.detections);
        assert_eq!(a.classifications, b.classifications);
    }
}
