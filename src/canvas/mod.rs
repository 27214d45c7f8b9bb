//! Drawing canvas
//!
//! Stroke storage, the pinch pen-up heuristic, the drawing session that ties
//! them to hand tracking, and export of the strokes to an image file.

pub mod color;
pub mod gesture;
pub mod raster;
pub mod session;
pub mod stroke;

pub use color::PaintColor;
pub use gesture::{Gesture, PinchDetector};
pub use raster::{rasterize, save_drawing, SaveError};
pub use session::{DrawingSession, HandUpdate};
pub use stroke::{Point, StrokeBuffer};
