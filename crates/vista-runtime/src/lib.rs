//! `vista-runtime` – The Perception Engine
//!
//! Orchestrates the `vista-perception` building blocks into the interface the
//! rest of the assistant calls: perceive a frame, describe a snapshot, or do
//! both in one quick scan.
//!
//! # Modules
//!
//! - [`engine`] – [`PerceptionEngine`][engine::PerceptionEngine]: fans a frame
//!   out to both recognizers, fuses the joined results, commits the snapshot
//!   and renders descriptions. Never fails.
//! - [`store`] – [`SnapshotStore`][store::SnapshotStore]: the single current
//!   snapshot, replaced atomically under a single-writer lock and announced on
//!   the event bus.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export
//!   to Jaeger, Grafana Tempo, or any OTLP-compatible collector.

pub mod engine;
pub mod store;
pub mod telemetry;

pub use engine::PerceptionEngine;
pub use store::SnapshotStore;
pub use telemetry::{LogSettings, TracerProviderGuard, init_tracing};

// Re-exported so callers can subscribe without a direct dependency on
// vista-middleware.
pub use vista_middleware::{EventBus, Topic, TopicReceiver};
