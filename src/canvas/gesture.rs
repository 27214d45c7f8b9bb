//! Pinch gesture classification
//!
//! The pen is lifted while the thumb tip is level with (or above) the index
//! fingertip, within a vertical threshold. Otherwise the index fingertip
//! draws.

use super::stroke::Point;

/// Default vertical thumb-to-index distance, in pixels
pub const DEFAULT_PINCH_THRESHOLD_PX: i32 = 30;

/// What a single hand observation means for the pen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    /// Pen up: the next drawn point starts a new stroke
    Pinch,
    /// Pen down at the index fingertip
    Draw(Point),
}

/// Thumb-to-index pinch heuristic
#[derive(Clone, Copy, Debug)]
pub struct PinchDetector {
    threshold_px: i32,
}

impl PinchDetector {
    pub fn new(threshold_px: i32) -> Self {
        Self { threshold_px }
    }

    /// Classify a thumb tip / index fingertip pair given in image pixels
    /// (y grows downward). Only the signed vertical offset is compared.
    pub fn classify(&self, thumb_tip: Point, index_tip: Point) -> Gesture {
        if thumb_tip.y - index_tip.y < self.threshold_px {
            Gesture::Pinch
        } else {
            Gesture::Draw(index_tip)
        }
    }
}

impl Default for PinchDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PINCH_THRESHOLD_PX)
    }
}
