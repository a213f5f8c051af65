//! Building the in-memory gallery from the roster at scan start.

use rollcall_core::types::GalleryError;
use rollcall_core::{FacePipeline, Gallery, GalleryEntry, Identity, PipelineError};
use rollcall_store::StudentRecord;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryBuildError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
}

/// Derive one reference embedding per student from their enrollment photo.
///
/// Students whose photo is missing, unreadable, or contains no detectable
/// face are skipped with a warning and simply won't match during the scan
/// — long-standing behavior, surfaced in logs only. Model failures abort
/// the build.
pub fn build_gallery(
    students: &[StudentRecord],
    pipeline: &mut FacePipeline,
) -> Result<Gallery, GalleryBuildError> {
    let mut gallery = Gallery::new();

    for student in students {
        if !Path::new(&student.photo_path).exists() {
            tracing::warn!(
                name = %student.name,
                photo = %student.photo_path,
                "photo file missing, student excluded from matching"
            );
            continue;
        }

        let photo = match image::open(&student.photo_path) {
            Ok(img) => img.to_luma8(),
            Err(e) => {
                tracing::warn!(
                    name = %student.name,
                    photo = %student.photo_path,
                    error = %e,
                    "photo unreadable, student excluded from matching"
                );
                continue;
            }
        };

        let (width, height) = photo.dimensions();
        let detections = pipeline.detect_and_embed(photo.as_raw(), width, height)?;
        let Some(detection) = detections.into_iter().next() else {
            tracing::warn!(
                name = %student.name,
                photo = %student.photo_path,
                "no face found in photo, student excluded from matching"
            );
            continue;
        };

        gallery.push(GalleryEntry {
            identity: Identity {
                name: student.name.clone(),
                class_label: student.class_label.clone(),
            },
            embedding: detection.embedding,
        })?;
    }

    tracing::info!(
        enrolled = students.len(),
        usable = gallery.len(),
        "gallery built"
    );
    Ok(gallery)
}
