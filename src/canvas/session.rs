//! Drawing session
//!
//! Ties the stroke buffer to the active color and the pinch heuristic. Hand
//! observations and mouse input are applied here.

use crate::ml::{Hand, LandmarkIdx};

use super::color::PaintColor;
use super::gesture::{Gesture, PinchDetector};
use super::stroke::{Point, StrokeBuffer};

/// Outcome of applying one hand observation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandUpdate {
    /// Pen lifted; `true` if a new stroke was opened
    PenUp(bool),
    /// Point appended to the open stroke
    Drew(Point),
    /// Pen is down but no stroke is open yet
    Ignored,
}

/// Per-session drawing state
#[derive(Clone, Debug)]
pub struct DrawingSession {
    strokes: StrokeBuffer,
    color: PaintColor,
    pinch: PinchDetector,
    canvas_size: (u32, u32),
}

impl DrawingSession {
    pub fn new(pinch: PinchDetector, history_limit: Option<usize>) -> Self {
        Self {
            strokes: StrokeBuffer::with_history_limit(history_limit),
            color: PaintColor::default(),
            pinch,
            canvas_size: (1280, 720),
        }
    }

    pub fn strokes(&self) -> &StrokeBuffer {
        &self.strokes
    }

    pub fn color(&self) -> PaintColor {
        self.color
    }

    pub fn set_color(&mut self, color: PaintColor) {
        if self.color != color {
            log::debug!("Active color: {:?}", color);
        }
        self.color = color;
    }

    /// Switch to the next color
    pub fn cycle_color(&mut self) -> PaintColor {
        self.set_color(self.color.next());
        self.color
    }

    /// Canvas (camera frame) size in pixels
    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_size = (width.max(1), height.max(1));
    }

    /// Apply a tracked hand: pinch lifts the pen, otherwise the index
    /// fingertip draws with the active color.
    pub fn apply_hand(&mut self, hand: &Hand) -> HandUpdate {
        let (width, height) = self.canvas_size;
        let thumb = hand.pixel(LandmarkIdx::ThumbTip, width, height);
        let index = hand.pixel(LandmarkIdx::IndexFingerTip, width, height);
        self.apply_gesture(self.pinch.classify(thumb, index))
    }

    /// Apply an already classified gesture
    pub fn apply_gesture(&mut self, gesture: Gesture) -> HandUpdate {
        match gesture {
            Gesture::Pinch => HandUpdate::PenUp(self.strokes.begin_stroke(self.color)),
            Gesture::Draw(point) => {
                if self.strokes.push_point(self.color, point) {
                    HandUpdate::Drew(point)
                } else {
                    HandUpdate::Ignored
                }
            }
        }
    }

    /// Start a mouse stroke at `point`
    pub fn begin_mouse_stroke(&mut self, point: Point) {
        self.strokes.begin_stroke(self.color);
        self.strokes.push_point(self.color, point);
    }

    /// Continue the current mouse stroke
    pub fn mouse_point(&mut self, point: Point) {
        self.strokes.push_free(self.color, point);
    }

    /// Erase everything drawn so far
    pub fn clear(&mut self) {
        self.strokes.clear();
        log::info!("Canvas cleared");
    }
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new(PinchDetector::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::HandLandmark;

    /// Hand with the thumb and index tips at pixel positions on a 100x100 canvas
    fn hand(thumb: (i32, i32), index: (i32, i32)) -> Hand {
        let mut hand = Hand::default();
        hand.landmarks[LandmarkIdx::ThumbTip as usize] = HandLandmark {
            x: thumb.0 as f32 / 100.0 + 0.001,
            y: thumb.1 as f32 / 100.0 + 0.001,
            z: 0.0,
        };
        hand.landmarks[LandmarkIdx::IndexFingerTip as usize] = HandLandmark {
            x: index.0 as f32 / 100.0 + 0.001,
            y: index.1 as f32 / 100.0 + 0.001,
            z: 0.0,
        };
        hand
    }

    fn session() -> DrawingSession {
        let mut session = DrawingSession::new(PinchDetector::new(30), None);
        session.set_canvas_size(100, 100);
        session
    }

    #[test]
    fn test_drawing_before_first_pinch_is_ignored() {
        let mut session = session();
        let update = session.apply_hand(&hand((10, 80), (10, 10)));
        assert_eq!(update, HandUpdate::Ignored);
        assert!(session.strokes().is_empty());
    }

    #[test]
    fn test_pinch_then_draw() {
        let mut session = session();
        assert_eq!(
            session.apply_hand(&hand((10, 15), (10, 10))),
            HandUpdate::PenUp(true)
        );
        assert_eq!(
            session.apply_hand(&hand((20, 80), (20, 20))),
            HandUpdate::Drew(Point::new(20, 20))
        );
        assert_eq!(
            session.apply_hand(&hand((21, 80), (21, 21))),
            HandUpdate::Drew(Point::new(21, 21))
        );

        let strokes: Vec<_> = session.strokes().strokes(PaintColor::Red).collect();
        assert_eq!(strokes, vec![&[Point::new(20, 20), Point::new(21, 21)][..]]);
    }

    #[test]
    fn test_each_pinch_starts_disjoint_stroke() {
        let mut session = session();
        session.apply_hand(&hand((0, 5), (0, 0)));
        session.apply_hand(&hand((0, 90), (1, 1)));
        session.apply_hand(&hand((0, 5), (0, 0)));
        // Holding the pinch does not open more strokes
        assert_eq!(
            session.apply_hand(&hand((0, 5), (0, 0))),
            HandUpdate::PenUp(false)
        );
        session.apply_hand(&hand((0, 90), (2, 2)));

        let strokes: Vec<Vec<Point>> = session
            .strokes()
            .strokes(PaintColor::Red)
            .map(<[Point]>::to_vec)
            .collect();
        assert_eq!(strokes, vec![vec![Point::new(1, 1)], vec![Point::new(2, 2)]]);
    }

    #[test]
    fn test_color_switch_keeps_other_history() {
        let mut session = session();
        session.apply_hand(&hand((0, 5), (0, 0)));
        session.apply_hand(&hand((0, 90), (5, 5)));

        assert_eq!(session.cycle_color(), PaintColor::Green);
        // Green has no stroke yet, so drawing is ignored until a pinch
        assert_eq!(session.apply_hand(&hand((0, 90), (6, 6))), HandUpdate::Ignored);
        session.apply_hand(&hand((0, 5), (0, 0)));
        session.apply_hand(&hand((0, 90), (7, 7)));

        assert_eq!(session.strokes().point_count(PaintColor::Red), 1);
        assert_eq!(session.strokes().point_count(PaintColor::Green), 1);
        let red: Vec<_> = session.strokes().strokes(PaintColor::Red).collect();
        assert_eq!(red, vec![&[Point::new(5, 5)][..]]);
    }

    #[test]
    fn test_mouse_strokes() {
        let mut session = session();
        session.set_color(PaintColor::Blue);
        session.begin_mouse_stroke(Point::new(1, 1));
        session.mouse_point(Point::new(2, 2));
        session.begin_mouse_stroke(Point::new(9, 9));

        assert_eq!(session.strokes().stroke_count(PaintColor::Blue), 2);
        assert_eq!(session.strokes().point_count(PaintColor::Blue), 3);
    }

    #[test]
    fn test_clear() {
        let mut session = session();
        session.begin_mouse_stroke(Point::new(1, 1));
        session.clear();
        assert!(session.strokes().is_empty());
        assert_eq!(session.color(), PaintColor::Red);
    }
}
