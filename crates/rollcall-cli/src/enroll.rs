//! Enrollment: capture a photo, then save the student.
//!
//! Capture and save are separate steps passing the frame by value, so
//! there is no shared "currently captured" state to get stale between
//! them.

use chrono::Local;
use rollcall_core::{FacePipeline, PipelineError};
use rollcall_hw::{CameraError, CaptureSession, Frame};
use rollcall_store::{Roster, StoreError, StudentRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("no face detected in any captured frame")]
    NoFaceDetected,
    #[error("failed to write photo {path}: {source}")]
    PhotoWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Capture up to `frames` frames and return the one holding the
/// highest-confidence face. Detection runs at full resolution here —
/// enrollment is a one-off, and the photo quality sets the ceiling for
/// every later match.
pub fn capture_enrollment_photo(
    session: &mut CaptureSession<'_>,
    pipeline: &mut FacePipeline,
    frames: usize,
) -> Result<Frame, EnrollError> {
    let mut best: Option<(Frame, f32)> = None;

    for _ in 0..frames {
        let Some(frame) = session.next_frame() else {
            break;
        };
        let gray = frame.to_grayscale();
        let faces = pipeline.detect(&gray, frame.width, frame.height)?;
        if let Some(face) = faces.first() {
            let better = best
                .as_ref()
                .map_or(true, |(_, best_conf)| face.confidence > *best_conf);
            if better {
                tracing::debug!(confidence = face.confidence, "new best enrollment frame");
                best = Some((frame, face.confidence));
            }
        }
    }

    match best {
        Some((frame, confidence)) => {
            tracing::info!(confidence, "enrollment photo captured");
            Ok(frame)
        }
        None => Err(EnrollError::NoFaceDetected),
    }
}

/// Persist the captured photo and the roster row.
pub fn save_student(
    roster: &Roster,
    photo_dir: &Path,
    name: &str,
    class_label: &str,
    frame: &Frame,
) -> Result<StudentRecord, EnrollError> {
    std::fs::create_dir_all(photo_dir).map_err(|source| EnrollError::PhotoWrite {
        path: photo_dir.to_path_buf(),
        source: image::ImageError::IoError(source),
    })?;

    let filename = format!(
        "{}_{}.png",
        name.replace(' ', "_"),
        Local::now().format("%H%M%S")
    );
    let photo_path = photo_dir.join(filename);

    image::save_buffer(
        &photo_path,
        &frame.data,
        frame.width,
        frame.height,
        image::ExtendedColorType::Rgb8,
    )
    .map_err(|source| EnrollError::PhotoWrite {
        path: photo_path.clone(),
        source,
    })?;

    let record = roster.add(name, class_label, &photo_path.to_string_lossy())?;
    Ok(record)
}
