//! rollcall-hw — camera capture and raw frame processing.
//!
//! V4L2-based webcam access producing RGB24 frames, plus the pixel-level
//! helpers the scanner needs: format conversion, downscaling and overlay
//! drawing.

pub mod camera;
pub mod frame;
pub mod overlay;

pub use camera::{Camera, CameraError, CaptureSession};
pub use frame::Frame;
