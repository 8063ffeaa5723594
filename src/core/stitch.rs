//! Stitch kinds and coordinate conversions
//!
//! Physical coordinates are millimeters. Raw coordinates are the signed
//! tenth-millimeter integers stored on disk by the PEC and PES formats.

use serde::{Deserialize, Serialize};

/// Kind of a single stitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StitchKind {
    /// Normal stitch - move and drop needle
    Normal,
    /// Jump stitch - move without sewing
    Jump,
    /// Trim stitch - cut thread, then move
    Trim,
    /// Stop - end of a thread color run, carries no coordinates
    Stop,
}

impl StitchKind {
    /// Stitch type code as stored in PES CSewSeg block headers
    pub fn code(self) -> u16 {
        match self {
            StitchKind::Normal => 0,
            StitchKind::Jump => 1,
            StitchKind::Trim => 2,
            StitchKind::Stop => 3,
        }
    }

    /// Stitch kind for a PES block stitch type code, if recognized
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(StitchKind::Normal),
            1 => Some(StitchKind::Jump),
            2 => Some(StitchKind::Trim),
            3 => Some(StitchKind::Stop),
            _ => None,
        }
    }
}

/// Convert a physical millimeter coordinate to its raw on-disk integer
///
/// # Example
///
/// ```
/// use peslib::core::stitch::mm_to_raw;
///
/// assert_eq!(mm_to_raw(10.0), 100);
/// assert_eq!(mm_to_raw(-0.25), -3);
/// ```
#[inline]
pub fn mm_to_raw(c: f32) -> i32 {
    (10.0 * c).round() as i32
}

/// Convert a raw tenth-millimeter integer to its physical coordinate
///
/// # Example
///
/// ```
/// use peslib::core::stitch::raw_to_mm;
///
/// assert_eq!(raw_to_mm(100), 10.0);
/// ```
#[inline]
pub fn raw_to_mm(c: i32) -> f32 {
    0.1 * c as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stitch_kind_codes() {
        for kind in [
            StitchKind::Normal,
            StitchKind::Jump,
            StitchKind::Trim,
            StitchKind::Stop,
        ] {
            assert_eq!(StitchKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(StitchKind::from_code(0x8003), None);
    }

    #[test]
    fn test_raw_round_trip() {
        // Every raw coordinate within the signed 12-bit delta space maps
        // back to itself through the physical representation.
        for raw in -2048..=2047 {
            assert_eq!(mm_to_raw(raw_to_mm(raw)), raw);
        }
    }

    #[test]
    fn test_rounding_ties() {
        assert_eq!(mm_to_raw(0.05), 1);
        assert_eq!(mm_to_raw(-0.05), -1);
    }
}
