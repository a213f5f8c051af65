//! The live scan loop: frame → detect → match → dedup → log → annotate.

use chrono::{DateTime, Local};
use rollcall_core::{
    Detection, EuclideanMatcher, FaceLocation, FacePipeline, Gallery, Identity, LastSeen,
    MatchResult, Matcher, PipelineError,
};
use rollcall_hw::{overlay, Frame};
use rollcall_store::{AttendanceLog, AttendanceLogError};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Label shown on a face box when no gallery entry is within tolerance.
pub const UNKNOWN_LABEL: &str = "Unknown";

const BOX_THICKNESS: u32 = 2;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("no enrolled students with a usable face photo; enroll someone first")]
    EmptyGallery,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Sink(#[from] AttendanceLogError),
}

/// Tunables for one scan session.
pub struct ScanSettings {
    pub tolerance: f32,
    pub dedup_window_secs: f64,
    pub downscale: f32,
}

/// Yields camera frames; `None` is end of stream and terminates the scan.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

impl FrameSource for rollcall_hw::CaptureSession<'_> {
    fn next_frame(&mut self) -> Option<Frame> {
        rollcall_hw::CaptureSession::next_frame(self)
    }
}

/// Face detection + embedding extraction over a grayscale buffer.
pub trait DetectEmbed {
    fn detect_and_embed(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, PipelineError>;
}

impl DetectEmbed for FacePipeline {
    fn detect_and_embed(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, PipelineError> {
        FacePipeline::detect_and_embed(self, gray, width, height)
    }
}

/// Destination for accepted attendance rows.
pub trait AttendanceSink {
    fn append(
        &mut self,
        name: &str,
        class_label: &str,
        at: DateTime<Local>,
    ) -> Result<(), AttendanceLogError>;
}

impl AttendanceSink for AttendanceLog {
    fn append(
        &mut self,
        name: &str,
        class_label: &str,
        at: DateTime<Local>,
    ) -> Result<(), AttendanceLogError> {
        AttendanceLog::append(self, name, class_label, at)
    }
}

/// One annotated face in a processed frame, in full-frame coordinates.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub location: FaceLocation,
    pub label: String,
    pub matched: bool,
}

/// What happened in one processed frame.
pub struct FrameReport {
    /// Full-resolution frame with face boxes drawn on it.
    pub annotated: Frame,
    pub annotations: Vec<Annotation>,
    /// Identities whose attendance row was written during this frame.
    pub logged: Vec<Identity>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanSummary {
    pub frames: u64,
    pub recognitions: u64,
    pub rows_logged: u64,
}

/// Run the scan until the source ends or `stop` is set.
///
/// Refuses an empty gallery before touching the camera. Each frame is
/// downscaled before detection; reported boxes are mapped back to
/// full-frame coordinates. One attendance row is written per recognized
/// identity that clears the dedup window; a sink failure aborts the scan.
pub fn run_scan(
    source: &mut impl FrameSource,
    pipeline: &mut impl DetectEmbed,
    gallery: &Gallery,
    sink: &mut impl AttendanceSink,
    settings: &ScanSettings,
    stop: &AtomicBool,
    mut on_frame: impl FnMut(FrameReport),
) -> Result<ScanSummary, ScanError> {
    if gallery.is_empty() {
        return Err(ScanError::EmptyGallery);
    }

    let matcher = EuclideanMatcher;
    let mut last_seen = LastSeen::new(settings.dedup_window_secs);
    let mut summary = ScanSummary::default();
    let upscale = 1.0 / settings.downscale;

    tracing::info!(
        enrolled = gallery.len(),
        tolerance = settings.tolerance,
        window_secs = settings.dedup_window_secs,
        "scan started"
    );

    while !stop.load(Ordering::Relaxed) {
        let Some(mut frame) = source.next_frame() else {
            tracing::info!("frame source ended");
            break;
        };
        summary.frames += 1;

        let small = frame.downscaled(settings.downscale);
        let gray = small.to_grayscale();
        let detections = pipeline.detect_and_embed(&gray, small.width, small.height)?;

        let mut annotations = Vec::with_capacity(detections.len());
        let mut logged = Vec::new();

        for detection in &detections {
            let location = detection.location.scaled(upscale);
            match matcher.compare(&detection.embedding, gallery.entries(), settings.tolerance) {
                MatchResult::Matched { identity, distance } => {
                    summary.recognitions += 1;
                    let now = Local::now();
                    if last_seen.should_log(&identity.name, now) {
                        sink.append(&identity.name, &identity.class_label, now)?;
                        summary.rows_logged += 1;
                        tracing::info!(
                            name = %identity.name,
                            class = %identity.class_label,
                            distance,
                            "attendance logged"
                        );
                        logged.push(identity.clone());
                    } else {
                        tracing::debug!(name = %identity.name, "repeat sighting suppressed");
                    }
                    annotations.push(Annotation {
                        location,
                        label: format!("{} ({})", identity.name, identity.class_label),
                        matched: true,
                    });
                }
                MatchResult::Unknown => {
                    annotations.push(Annotation {
                        location,
                        label: UNKNOWN_LABEL.to_string(),
                        matched: false,
                    });
                }
            }
        }

        for a in &annotations {
            let color = if a.matched {
                overlay::MATCHED_COLOR
            } else {
                overlay::UNKNOWN_COLOR
            };
            overlay::draw_rect(
                &mut frame,
                a.location.left as i32,
                a.location.top as i32,
                a.location.right as i32,
                a.location.bottom as i32,
                color,
                BOX_THICKNESS,
            );
        }

        on_frame(FrameReport {
            annotated: frame,
            annotations,
            logged,
        });
    }

    tracing::info!(
        frames = summary.frames,
        recognitions = summary.recognitions,
        rows = summary.rows_logged,
        "scan finished"
    );
    Ok(summary)
}
