//! Fusion & Deduplication.
//!
//! Merges the thresholded detector and classifier lists into one capped
//! [`Snapshot`].
//!
//! - **Detector entities** are always retained and come first.
//! - **Classifier entities** are dropped when they overlap a detector
//!   entity: the lowercase label of one is a substring of the other's. This
//!   tolerates vocabulary mismatches between the two recognizers (a detector
//!   saying `"Dog"` while the classifier says `"Golden Retriever Dog"`).
//! - The merged list is truncated to the cap, so the classifier tail is
//!   dropped first.
//!
//! # Example
//!
//! ```rust
//! use vista_perception::fusion::fuse;
//! use vista_types::{PerceivedEntity, Region, Sector};
//!
//! let entity = |label: &str| PerceivedEntity {
//!     label: label.to_string(),
//!     confidence: 0.9,
//!     region: Region::FULL_FRAME,
//!     sector: Sector::Center,
//! };
//!
//! let snapshot = fuse(vec![entity("Dog")], vec![entity("Dog Toy"), entity("Park")], 5);
//! assert_eq!(snapshot.labels(), vec!["Dog", "Park"]);
//! ```

use vista_types::{PerceivedEntity, Snapshot};

/// Whether two labels overlap (case-insensitive containment, either way).
pub fn labels_overlap(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Merge `detections` and `classifications` into a snapshot of at most `cap`
/// entities.
pub fn fuse(
    detections: Vec<PerceivedEntity>,
    classifications: Vec<PerceivedEntity>,
    cap: usize,
) -> Snapshot {
    let survivors: Vec<PerceivedEntity> = classifications
        .into_iter()
        .filter(|candidate| {
            !detections
                .iter()
                .any(|kept| labels_overlap(&kept.label, &candidate.label))
        })
        .collect();

    let mut entities = detections;
    entities.extend(survivors);
    entities.truncate(cap);
    Snapshot::new(entities)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
