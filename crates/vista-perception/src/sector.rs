//! Spatial Localizer.
//!
//! Maps a normalized [`Region`] to one of the nine [`Sector`]s of the frame.
//!
//! Both axes are cut into thirds at `0.33` and `0.67`:
//!
//! ```text
//!  [0, 0.33)      [0.33, 0.67]     (0.67, 1]
//!    low             middle           high
//! ```
//!
//! The producing coordinate system has its origin at the bottom-left corner,
//! so the vertical coordinate is inverted (`1 - y`) before quantization: the
//! low vertical third is the *top* of the image.
//!
//! # Example
//!
//! ```rust
//! use vista_perception::sector::sector_of;
//! use vista_types::{Region, Sector};
//!
//! // A box hugging the upper-left corner (origin is bottom-left).
//! let region = Region::new(0.0, 0.8, 0.2, 0.2);
//! assert_eq!(sector_of(&region), Sector::TopLeft);
//! ```

use vista_types::{Region, Sector};

/// Lower boundary of the middle third (inclusive).
pub const LOWER_BOUNDARY: f32 = 0.33;
/// Upper boundary of the middle third (inclusive).
pub const UPPER_BOUNDARY: f32 = 0.67;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Third {
    Low,
    Middle,
    High,
}

fn third(v: f32) -> Third {
    if v < LOWER_BOUNDARY {
        Third::Low
    } else if v <= UPPER_BOUNDARY {
        Third::Middle
    } else {
        // Also catches NaN, so the mapping stays total.
        Third::High
    }
}

/// Classify `region` by the position of its center point.
pub fn sector_of(region: &Region) -> Sector {
    let (cx, cy) = region.center();
    sector_at(cx, cy)
}

/// Classify a center point given in bottom-left normalized coordinates.
pub fn sector_at(cx: f32, cy: f32) -> Sector {
    let horizontal = third(cx);
    let vertical = third(1.0 - cy);

    match (vertical, horizontal) {
        (Third::Low, Third::Low) => Sector::TopLeft,
        (Third::Low, Third::Middle) => Sector::Top,
        (Third::Low, Third::High) => Sector::TopRight,
        (Third::Middle, Third::Low) => Sector::Left,
        (Third::Middle, Third::Middle) => Sector::Center,
        (Third::Middle, Third::High) => Sector::Right,
        (Third::High, Third::Low) => Sector::BottomLeft,
        (Third::High, Third::Middle) => Sector::Bottom,
        (Third::High, Third::High) => Sector::BottomRight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A zero-area region centered on `(cx, cy)`.
    fn point(cx: f32, cy: f32) -> Region {
        Region::new(cx, cy, 0.0, 0.0)
    }

    #[test]
    fn full_frame_is_center() {
        assert_eq!(sector_of(&Region::FULL_FRAME), Sector::Center);
    }

    #[test]
    fn horizontal_boundary_at_lower_third() {
        // 0.33 belongs to the middle third, 0.329 to the left one.
        assert_eq!(sector_of(&point(0.33, 0.5)), Sector::Center);
        assert_eq!(sector_of(&point(0.329, 0.5)), Sector::Left);
    }

    #[test]
    fn horizontal_boundary_at_upper_third() {
        assert_eq!(sector_of(&point(0.67, 0.5)), Sector::Center);
        assert_eq!(sector_of(&point(0.671, 0.5)), Sector::Right);
    }

    #[test]
    fn vertical_axis_is_inverted() {
        // High y is near the top of the image.
        assert_eq!(sector_of(&point(0.5, 0.9)), Sector::Top);
        assert_eq!(sector_of(&point(0.5, 0.1)), Sector::Bottom);
    }

    #[test]
    fn corners_map_to_diagonal_sectors() {
        assert_eq!(sector_of(&point(0.1, 0.9)), Sector::TopLeft);
        assert_eq!(sector_of(&point(0.9, 0.9)), Sector::TopRight);
        assert_eq!(sector_of(&point(0.1, 0.1)), Sector::BottomLeft);
        assert_eq!(sector_of(&point(0.9, 0.1)), Sector::BottomRight);
    }

    #[test]
    fn center_uses_region_midpoint_not_origin() {
        // Origin sits in the bottom-left third but the box spans to the middle.
        let region = Region::new(0.2, 0.2, 0.6, 0.6);
        assert_eq!(sector_of(&region), Sector::Center);
    }

    #[test]
    fn every_sector_is_reachable() {
        let coords = [0.1_f32, 0.5, 0.9];
        let mut seen = Vec::new();
        for &x in &coords {
            for &y in &coords {
                let s = sector_at(x, y);
                if !seen.contains(&s) {
                    seen.push(s);
                }
            }
        }
        assert_eq!(seen.len(), Sector::ALL.len());
    }

    #[test]
    fn non_finite_input_does_not_panic() {
        let s = sector_at(f32::NAN, f32::INFINITY);
        assert!(Sector::ALL.contains(&s));
    }
}
