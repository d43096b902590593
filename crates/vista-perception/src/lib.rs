//! `vista-perception` – Scene perception building blocks.
//!
//! Turns the raw output of two independent recognizers into a ranked,
//! deduplicated set of "things noticed" and a sentence describing them.
//!
//! # Modules
//!
//! - [`recognizer`] – [`Detector`][recognizer::Detector] and
//!   [`Classifier`][recognizer::Classifier]: the async traits every
//!   recognition backend implements.
//! - [`dispatcher`] – [`FanInDispatcher`][dispatcher::FanInDispatcher]: runs
//!   both recognizers concurrently, joins them, and applies the confidence
//!   thresholds.
//! - [`sector`] – [`sector_of`][sector::sector_of]: quantizes a region into
//!   one of nine [`Sector`][vista_types::Sector]s.
//! - [`label`] – [`normalize`][label::normalize]: raw identifier to
//!   speakable phrase.
//! - [`fusion`] – [`fuse`][fusion::fuse]: merges both lists with
//!   substring deduplication and a size cap.
//! - [`describe`] – [`Describer`][describe::Describer]: renders a snapshot
//!   into one sentence.
//! - [`config`] – [`PerceptionConfig`][config::PerceptionConfig]: thresholds,
//!   caps and the sector phrase table.

pub mod config;
pub mod describe;
pub mod dispatcher;
pub mod fusion;
pub mod label;
pub mod recognizer;
pub mod sector;

pub use config::PerceptionConfig;
pub use describe::{Describer, FALLBACK_DESCRIPTION, SectorPhrases};
pub use dispatcher::{Dispatched, FanInDispatcher};
pub use fusion::fuse;
pub use label::normalize;
pub use recognizer::{Classifier, Detector};
pub use sector::sector_of;
