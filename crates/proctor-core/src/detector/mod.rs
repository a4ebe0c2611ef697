//! Detector adapters: pure per-frame operations that wrap external
//! vision primitives and normalise their output into the
//! `CameraOutput`/`ScreenOutput` shapes the rest of the pipeline
//! consumes.

pub mod camera;
pub mod screen;

pub use camera::{CameraAdapter, CameraPrimitiveOutput, CameraVision, HandLandmarks, NullCameraVision};
pub use screen::{DefaultScreenVision, ScreenAdapter, ScreenChangeStats, ScreenVision};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOutput {
    pub face_count: usize,
    pub hands_visible: bool,
    pub hands_typing: bool,
    pub typing_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenOutput {
    pub screen_typing: bool,
}
