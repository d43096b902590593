//! [`PerceptionEngine`] – the Perception Interface exposed to callers.
//!
//! Wires the [`FanInDispatcher`], fusion, the [`SnapshotStore`] and the
//! [`Describer`] into three total entry points:
//!
//! 1. [`perceive`][PerceptionEngine::perceive] – frame in, fused
//!    [`Snapshot`] out. The snapshot also becomes the current one.
//! 2. [`describe`][PerceptionEngine::describe] – snapshot in, sentence out.
//! 3. [`quick_scan`][PerceptionEngine::quick_scan] – both of the above.
//!
//! None of them return `Result`. Recognizer failures shrink the result set,
//! a frame that cannot be decoded yields an empty snapshot, and an empty
//! snapshot is described with the fallback sentence.
//!
//! # Events
//!
//! | Topic | Payload | When |
//! |---|---|---|
//! | [`Topic::Snapshots`] | `PerceptionStarted` | a valid frame was accepted |
//! | [`Topic::Snapshots`] | `SnapshotUpdated` | a fusion was committed |
//! | [`Topic::Diagnostics`] | `RecognizerDegraded` | a branch failed or timed out |
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vista_perception::{Classifier, Detector, PerceptionConfig};
//! use vista_runtime::PerceptionEngine;
//! use vista_types::Frame;
//!
//! async fn speak(detector: Arc<dyn Detector>, classifier: Arc<dyn Classifier>) {
//!     let engine = PerceptionEngine::new(detector, classifier, PerceptionConfig::default());
//!     let sentence = engine.quick_scan(Frame::blank(640, 480)).await;
//!     println!("{sentence}");
//! }
//! ```

use std::sync::Arc;

use tracing::{debug, instrument, warn};
use vista_middleware::{EventBus, Topic, TopicReceiver};
use vista_perception::{
    Classifier, Describer, Detector, FanInDispatcher, PerceptionConfig, fusion::fuse,
};
use vista_types::{Event, EventPayload, Frame, Snapshot};

use crate::store::SnapshotStore;

const EVENT_SOURCE: &str = "vista-runtime::engine";

/// Scene perception engine.
///
/// Owns its recognizers through `Arc`s and hands callers owned values, so it
/// can be shared freely behind an `Arc` across tasks.
pub struct PerceptionEngine {
    dispatcher: FanInDispatcher,
    store: SnapshotStore,
    describer: Describer,
    bus: EventBus,
    config: PerceptionConfig,
}

impl PerceptionEngine {
    /// Build an engine with its own event bus.
    ///
    /// An invalid `config` is logged and replaced by the defaults.
    pub fn new(
        detector: Arc<dyn Detector>,
        classifier: Arc<dyn Classifier>,
        config: PerceptionConfig,
    ) -> Self {
        Self::with_bus(detector, classifier, config, EventBus::default())
    }

    /// Build an engine that publishes on an existing `bus`.
    pub fn with_bus(
        detector: Arc<dyn Detector>,
        classifier: Arc<dyn Classifier>,
        config: PerceptionConfig,
        bus: EventBus,
    ) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid perception config; falling back to defaults");
                PerceptionConfig::default()
            }
        };

        Self {
            dispatcher: FanInDispatcher::new(detector, classifier, &config),
            store: SnapshotStore::new(bus.clone()),
            describer: config.describer(),
            bus,
            config,
        }
    }

    /// Run both recognizers over `frame`, fuse their output and make the
    /// result the current snapshot.
    ///
    /// A malformed frame is reported once and yields an empty snapshot
    /// without touching the current one.
    #[instrument(name = "perceive", skip_all, fields(width = frame.width, height = frame.height))]
    pub async fn perceive(&self, frame: Frame) -> Snapshot {
        if let Err(e) = frame.validate() {
            warn!(error = %e, "nothing to perceive");
            return Snapshot::empty();
        }

        self.publish(
            Topic::Snapshots,
            EventPayload::PerceptionStarted {
                frame_width: frame.width,
                frame_height: frame.height,
            },
        );

        let dispatched = self.dispatcher.dispatch(Arc::new(frame)).await;
        for (source, error) in dispatched.degraded {
            self.publish(
                Topic::Diagnostics,
                EventPayload::RecognizerDegraded {
                    source,
                    reason: error.to_string(),
                },
            );
        }

        let fused = fuse(
            dispatched.detections,
            dispatched.classifications,
            self.config.snapshot_cap,
        );
        let committed = self.store.commit(fused);
        (*committed).clone()
    }

    /// Render `snapshot` into one sentence.
    pub fn describe(&self, snapshot: &Snapshot) -> String {
        self.describer.describe(snapshot)
    }

    /// [`perceive`][Self::perceive] then [`describe`][Self::describe].
    pub async fn quick_scan(&self, frame: Frame) -> String {
        let snapshot = self.perceive(frame).await;
        self.describe(&snapshot)
    }

    /// The most recently committed snapshot. May lag behind an in-flight
    /// [`perceive`][Self::perceive].
    pub fn current(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// Describe the current snapshot.
    pub fn describe_current(&self) -> String {
        self.describe(&self.current())
    }

    /// Listen to engine events on `topic`.
    pub fn subscribe(&self, topic: Topic) -> TopicReceiver {
        self.bus.subscribe_to(topic)
    }

    /// The effective configuration (after validation).
    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Err(e) = self.bus.publish_to(topic, Event::new(EVENT_SOURCE, payload)) {
            debug!(error = %e, "event not delivered");
        }
    }
}
