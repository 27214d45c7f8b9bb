//! Hand landmark topology
//!
//! 21 keypoints per hand in the MediaPipe ordering, normalized to the frame
//! (0.0..1.0 on both axes, y down).

use crate::canvas::Point;

/// Number of landmarks per hand
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum LandmarkIdx {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexFingerMcp = 5,
    IndexFingerPip = 6,
    IndexFingerDip = 7,
    IndexFingerTip = 8,
    MiddleFingerMcp = 9,
    MiddleFingerPip = 10,
    MiddleFingerDip = 11,
    MiddleFingerTip = 12,
    RingFingerMcp = 13,
    RingFingerPip = 14,
    RingFingerDip = 15,
    RingFingerTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

/// Bones drawn for the skeleton overlay
pub const HAND_CONNECTIONS: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        (Wrist, ThumbCmc),
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        (RingFingerMcp, PinkyMcp),
        (Wrist, PinkyMcp),
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// Hand landmark (normalized coordinates)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Detected hand
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    /// 21 landmarks
    pub landmarks: [HandLandmark; LANDMARK_COUNT],
    /// Presence score reported by the landmark model
    pub presence: f32,
    /// Is right hand
    pub is_right: bool,
}

impl Default for Hand {
    fn default() -> Self {
        Self {
            landmarks: [HandLandmark::default(); LANDMARK_COUNT],
            presence: 0.0,
            is_right: false,
        }
    }
}

impl Hand {
    pub fn landmark(&self, idx: LandmarkIdx) -> HandLandmark {
        self.landmarks[idx as usize]
    }

    /// Landmark position in pixels of a `width` x `height` image (truncating)
    pub fn pixel(&self, idx: LandmarkIdx, width: u32, height: u32) -> Point {
        let lm = self.landmark(idx);
        Point::new((lm.x * width as f32) as i32, (lm.y * height as f32) as i32)
    }

    /// All landmarks in pixels of a `width` x `height` image
    pub fn to_pixels(&self, width: u32, height: u32) -> [Point; LANDMARK_COUNT] {
        self.landmarks
            .map(|lm| Point::new((lm.x * width as f32) as i32, (lm.y * height as f32) as i32))
    }

    /// "Right" or "Left" as reported by the model
    pub fn side_label(&self) -> &'static str {
        if self.is_right {
            "Right"
        } else {
            "Left"
        }
    }
}
