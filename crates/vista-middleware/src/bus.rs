//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Snapshots`] | `PerceptionStarted` and `SnapshotUpdated` for every perceive call |
//! | [`Topic::Diagnostics`] | `RecognizerDegraded` when a branch fails or times out |

use tokio::sync::broadcast;
use tracing::warn;
use vista_types::{Event, VistaError};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// Routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Perception lifecycle and fused snapshots.
    Snapshots,
    /// Recognizer health: degraded branches.
    Diagnostics,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    snapshots: broadcast::Sender<Event>,
    diagnostics: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently and is
    /// raised to at least one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (snapshots, _) = broadcast::channel(capacity);
        let (diagnostics, _) = broadcast::channel(capacity);
        Self {
            snapshots,
            diagnostics,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    ///
    /// # Errors
    ///
    /// Returns [`VistaError::Channel`] when nobody is subscribed to the
    /// topic. Publishers that do not care about listeners may ignore it.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, VistaError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| VistaError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Snapshots => &self.snapshots,
            Topic::Diagnostics => &self.diagnostics,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Wait for the next event, skipping over lag.
    ///
    /// Returns `None` once the bus is closed.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_types::{EventPayload, RecognizerSource};

    fn started() -> Event {
        Event::new(
            "vista-middleware::test",
            EventPayload::PerceptionStarted {
                frame_width: 640,
                frame_height: 480,
            },
        )
    }

    #[test]
    fn publish_without_subscribers_returns_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Snapshots, started());
        assert!(matches!(result, Err(VistaError::Channel(_))));
    }

    #[tokio::test]
    async fn topic_multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut subscriber1 = bus.subscribe_to(Topic::Snapshots);
        let mut subscriber2 = bus.subscribe_to(Topic::Snapshots);
        assert_eq!(bus.subscriber_count(Topic::Snapshots), 2);

        let event = started();
        let delivered = bus.publish_to(Topic::Snapshots, event.clone())?;
        assert_eq!(delivered, 2);

        assert_eq!(subscriber1.recv().await?.id, event.id);
        assert_eq!(subscriber2.recv().await?.id, event.id);
        Ok(())
    }

    /// A `Diagnostics` subscriber must not see `Snapshots` traffic.
    #[tokio::test]
    async fn topic_subscriber_does_not_receive_other_topic_events() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut diagnostics = bus.subscribe_to(Topic::Diagnostics);
        let _snapshots = bus.subscribe_to(Topic::Snapshots);

        bus.publish_to(Topic::Snapshots, started())?;

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            diagnostics.recv(),
        )
        .await;
        assert!(result.is_err(), "Diagnostics must not receive a Snapshots event");
        assert_eq!(diagnostics.topic(), Topic::Diagnostics);
        Ok(())
    }

    #[tokio::test]
    async fn next_skips_lag_and_returns_latest() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe_to(Topic::Diagnostics);

        for _ in 0..10 {
            let _ = bus.publish_to(
                Topic::Diagnostics,
                Event::new(
                    "flood",
                    EventPayload::RecognizerDegraded {
                        source: RecognizerSource::Detector,
                        reason: "timeout".to_string(),
                    },
                ),
            );
        }

        let event = slow.next().await;
        assert!(event.is_some());
    }

    #[tokio::test]
    async fn recv_reports_lag_on_slow_subscriber() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_to(Topic::Snapshots);
        for _ in 0..100 {
            let _ = bus.publish_to(Topic::Snapshots, started());
        }
        let result = slow.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
    }

    #[test]
    fn try_recv_is_empty_before_publish() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Snapshots);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
