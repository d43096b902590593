//! `vista-middleware` – Event plumbing.
//!
//! Routes perception events to interested listeners (voice output, UI,
//! downstream personalization) without caring about what they do with them.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
