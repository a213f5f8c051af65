//! rollcall-core — face recognition primitives for attendance scanning.
//!
//! Detection (SCRFD) and embedding extraction (ArcFace) run via ONNX
//! Runtime. Matching is a full linear scan over the enrolled gallery;
//! repeated sightings are rate-limited by a per-name dedup window.

pub mod dedup;
pub mod detector;
pub mod encoder;
pub mod matcher;
pub mod pipeline;
pub mod types;

pub use dedup::LastSeen;
pub use detector::FaceBox;
pub use matcher::{EuclideanMatcher, Matcher};
pub use pipeline::{FacePipeline, PipelineError};
pub use types::{Detection, Embedding, FaceLocation, Gallery, GalleryEntry, Identity, MatchResult};

use std::path::PathBuf;

/// Default directory for ONNX model files.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("/usr/share/rollcall/models")
}
