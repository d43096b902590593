use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which recognizer produced a [`RawResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerSource {
    /// Object detector: localizes instances with a bounding region.
    Detector,
    /// Whole-image classifier: labels the frame without localizing.
    Classifier,
}

impl std::fmt::Display for RecognizerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognizerSource::Detector => write!(f, "detector"),
            RecognizerSource::Classifier => write!(f, "classifier"),
        }
    }
}

/// Axis-aligned rectangle normalized to `[0, 1]` on both axes.
///
/// The producing coordinate system places its origin at the bottom-left
/// corner of the frame, so a larger `y` means higher up in the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    /// The whole frame. Assigned to classifier output, which is not localized.
    pub const FULL_FRAME: Region = Region {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point `(x + width/2, y + height/2)` in bottom-left coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Bitwise identity, used to group detector labels that describe the same
    /// instance.
    pub fn same_instance(&self, other: &Region) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.width.to_bits() == other.width.to_bits()
            && self.height.to_bits() == other.height.to_bits()
    }
}

/// One of nine coarse spatial regions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Sector {
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Sector {
    /// All sectors, in declaration order.
    pub const ALL: [Sector; 9] = [
        Sector::Center,
        Sector::Left,
        Sector::Right,
        Sector::Top,
        Sector::Bottom,
        Sector::TopLeft,
        Sector::TopRight,
        Sector::BottomLeft,
        Sector::BottomRight,
    ];

    /// The stable camelCase tag, e.g. `"topLeft"`.
    pub fn tag(&self) -> &'static str {
        match self {
            Sector::Center => "center",
            Sector::Left => "left",
            Sector::Right => "right",
            Sector::Top => "top",
            Sector::Bottom => "bottom",
            Sector::TopLeft => "topLeft",
            Sector::TopRight => "topRight",
            Sector::BottomLeft => "bottomLeft",
            Sector::BottomRight => "bottomRight",
        }
    }
}

impl std::str::FromStr for Sector {
    type Err = VistaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sector::ALL
            .into_iter()
            .find(|sector| sector.tag() == s)
            .ok_or_else(|| VistaError::Config(format!("unknown sector tag: {s}")))
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Unprocessed recognizer output, before thresholding and localization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawResult {
    /// Machine identifier, e.g. `"golden_retriever"`.
    pub label: String,
    /// Score in `[0, 1]`.
    pub confidence: f32,
    pub region: Region,
    pub source: RecognizerSource,
}

/// A [`RawResult`] that passed its threshold, with a speakable label and a
/// sector assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerceivedEntity {
    pub label: String,
    pub confidence: f32,
    pub region: Region,
    pub sector: Sector,
}

impl PerceivedEntity {
    /// Confidence as a truncated integer percentage for display.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0) as u8
    }
}

/// The ranked, deduplicated, capped set of entities produced by one fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    pub id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub entities: Vec<PerceivedEntity>,
}

impl Snapshot {
    pub fn new(entities: Vec<PerceivedEntity>) -> Self {
        Self {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            entities,
        }
    }

    /// A snapshot with nothing in it.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Labels in snapshot order. Handy for logging and assertions.
    pub fn labels(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.label.as_str()).collect()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// A captured image handed to the recognizers.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (greyscale, RGB24 or RGBA32).
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// A black RGB24 frame of the given size.
    ///
    /// Dimensions too large to address get an empty buffer, which
    /// [`validate`][Self::validate] rejects.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = Self::pixel_count(width, height)
            .and_then(|pixels| pixels.checked_mul(3))
            .unwrap_or(0);
        Self::new(width, height, vec![0u8; len])
    }

    fn pixel_count(width: u32, height: u32) -> Option<usize> {
        (width as usize).checked_mul(height as usize)
    }

    /// Check that the buffer can be decoded as a 1, 3 or 4 channel image.
    ///
    /// # Errors
    ///
    /// Returns [`VistaError::MalformedFrame`] for zero dimensions or a buffer
    /// whose length matches no supported channel count.
    pub fn validate(&self) -> Result<(), VistaError> {
        if self.width == 0 || self.height == 0 {
            return Err(VistaError::MalformedFrame(format!(
                "zero-sized frame {}x{}",
                self.width, self.height
            )));
        }
        let Some(pixels) = Self::pixel_count(self.width, self.height) else {
            return Err(VistaError::MalformedFrame(format!(
                "{}x{} frame is too large to address",
                self.width, self.height
            )));
        };
        if [1usize, 3, 4]
            .iter()
            .any(|c| pixels.checked_mul(*c) == Some(self.data.len()))
        {
            Ok(())
        } else {
            Err(VistaError::MalformedFrame(format!(
                "{} bytes cannot hold a {}x{} image",
                self.data.len(),
                self.width,
                self.height
            )))
        }
    }
}

/// Unified event wrapper for the perception event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "vista-runtime::engine"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// A frame was accepted and both recognizers were launched.
    PerceptionStarted { frame_width: u32, frame_height: u32 },
    /// A fusion completed and replaced the current snapshot.
    SnapshotUpdated(Snapshot),
    /// One recognizer branch failed or timed out and contributed nothing.
    RecognizerDegraded {
        source: RecognizerSource,
        reason: String,
    },
}

/// Error type shared by the perception crates.
///
/// None of these escape the perception entry points; they are logged and
/// degraded to fewer results where they occur.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VistaError {
    #[error("Recognizer Failure ({source_kind}): {details}")]
    Recognizer {
        source_kind: RecognizerSource,
        details: String,
    },

    #[error("Recognizer Timeout ({source_kind}) after {millis} ms")]
    Timeout {
        source_kind: RecognizerSource,
        millis: u64,
    },

    #[error("Malformed Frame: {0}")]
    MalformedFrame(String),

    #[error("Event Bus Error: {0}")]
    Channel(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
