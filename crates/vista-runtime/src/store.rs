//! [`SnapshotStore`] – the single current [`Snapshot`].
//!
//! The current snapshot is the only shared mutable state in the perception
//! subsystem. Writers replace it whole under an exclusive lock; readers get
//! an `Arc` to an immutable value and never observe a half-written fusion.
//! Every commit is announced on [`Topic::Snapshots`] while the write lock is
//! still held, so the order of `SnapshotUpdated` events equals commit order.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use vista_middleware::{EventBus, Topic};
use vista_types::{Event, EventPayload, Snapshot};

const EVENT_SOURCE: &str = "vista-runtime::store";

/// Holder of the current snapshot (last-commit-wins, no history).
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    bus: EventBus,
}

impl SnapshotStore {
    /// Start with an empty snapshot.
    pub fn new(bus: EventBus) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            bus,
        }
    }

    /// The snapshot committed most recently.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read())
    }

    /// Replace the current snapshot with `snapshot` and announce it.
    pub fn commit(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write();
        *guard = Arc::clone(&snapshot);

        info!(
            snapshot_id = %snapshot.id,
            entities = snapshot.len(),
            labels = ?snapshot.labels(),
            "snapshot committed"
        );
        let event = Event::new(EVENT_SOURCE, EventPayload::SnapshotUpdated((*snapshot).clone()));
        if let Err(e) = self.bus.publish_to(Topic::Snapshots, event) {
            debug!(error = %e, "snapshot update not delivered");
        }
        drop(guard);

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_types::{PerceivedEntity, Region, Sector};

    fn snapshot(labels: &[&str]) -> Snapshot {
        Snapshot::new(
            labels
                .iter()
                .map(|l| PerceivedEntity {
                    label: l.to_string(),
                    confidence: 0.9,
                    region: Region::FULL_FRAME,
                    sector: Sector::Center,
                })
                .collect(),
        )
    }

    #[test]
    fn starts_empty() {
        let store = SnapshotStore::new(EventBus::default());
        assert!(store.current().is_empty());
    }

    #[test]
    fn commit_replaces_previous_snapshot() {
        let store = SnapshotStore::new(EventBus::default());
        store.commit(snapshot(&["Dog"]));
        store.commit(snapshot(&["Cat", "Sofa"]));
        assert_eq!(store.current().labels(), vec!["Cat", "Sofa"]);
    }

    #[test]
    fn readers_keep_their_copy_after_replacement() {
        let store = SnapshotStore::new(EventBus::default());
        store.commit(snapshot(&["Dog"]));
        let held = store.current();
        store.commit(snapshot(&["Cat"]));
        assert_eq!(held.labels(), vec!["Dog"]);
        assert_eq!(store.current().labels(), vec!["Cat"]);
    }

    #[tokio::test]
    async fn commit_is_published_on_snapshot_topic() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Snapshots);
        let store = SnapshotStore::new(bus);

        let committed = store.commit(snapshot(&["Dog"]));
        let event = rx.recv().await.expect("snapshot event");
        match event.payload {
            EventPayload::SnapshotUpdated(s) => assert_eq!(s.id, committed.id),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn concurrent_commits_leave_one_whole_snapshot() {
        let store = Arc::new(SnapshotStore::new(EventBus::default()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let label = format!("Thing {i}");
                    store.commit(snapshot(&[label.as_str(), label.as_str()]));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let current = store.current();
        assert_eq!(current.len(), 2);
        assert_eq!(current.entities[0].label, current.entities[1].label);
    }
}
