//! Air Canvas - draw in the air with a fingertip
//!
//! Captures the webcam, tracks one hand with an ONNX hand landmark model, and
//! turns index fingertip motion into strokes overlaid on the camera feed. A
//! thumb-to-index pinch lifts the pen. An optional login screen is backed by a
//! local SQLite credential store.

pub mod app;
pub mod auth;
pub mod camera;
pub mod canvas;
pub mod ml;
pub mod settings;
pub mod ui;

pub use app::App;
