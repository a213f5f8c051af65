//! Scan session engine: owns the camera on a dedicated OS thread.
//!
//! The session moves Idle → Scanning → Stopped explicitly: `spawn` does
//! all fail-fast resource setup and starts the loop, `stop`/`join` end
//! it. Frame reports cross to the caller over a bounded channel, so the
//! loop never blocks on a slow consumer — reports are dropped instead.

use crate::config::Config;
use crate::scan::{self, FrameReport, ScanError, ScanSettings, ScanSummary};
use rollcall_core::{FacePipeline, Gallery};
use rollcall_hw::{Camera, CameraError};
use rollcall_store::AttendanceLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

const REPORT_CHANNEL_CAPACITY: usize = 8;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("failed to spawn scan thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
    #[error("scan thread panicked")]
    ThreadPanicked,
}

/// Handle to a running scan session.
pub struct ScanEngine {
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<Result<ScanSummary, EngineError>>>,
}

impl ScanEngine {
    /// Open the camera and start scanning on a named OS thread. Resource
    /// failures surface here, before any frame is processed; the pipeline
    /// and gallery must already be built (and the gallery non-empty).
    ///
    /// Returns the engine handle plus the receiving end of the per-frame
    /// report stream; lagging consumers miss frames, never block them.
    pub fn spawn(
        config: &Config,
        mut pipeline: FacePipeline,
        gallery: Gallery,
        sink: AttendanceLog,
    ) -> Result<(ScanEngine, mpsc::Receiver<FrameReport>), EngineError> {
        if gallery.is_empty() {
            return Err(ScanError::EmptyGallery.into());
        }

        let camera = Camera::open(&config.camera_device)?;
        tracing::info!(
            device = %camera.device_path,
            width = camera.width,
            height = camera.height,
            "camera ready for scanning"
        );

        let settings = ScanSettings {
            tolerance: config.tolerance,
            dedup_window_secs: config.dedup_window_secs,
            downscale: config.downscale,
        };
        let warmup_frames = config.warmup_frames;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let (report_tx, report_rx) = mpsc::channel::<FrameReport>(REPORT_CHANNEL_CAPACITY);

        let thread = std::thread::Builder::new()
            .name("rollcall-scan".into())
            .spawn(move || {
                let mut sink = sink;
                let mut session = camera.start()?;
                session.discard_warmup(warmup_frames);

                let summary = scan::run_scan(
                    &mut session,
                    &mut pipeline,
                    &gallery,
                    &mut sink,
                    &settings,
                    &stop_flag,
                    |report| {
                        if report_tx.try_send(report).is_err() {
                            tracing::trace!("report channel full, dropping frame report");
                        }
                    },
                )?;
                // Camera stream released when `session` drops here.
                Ok(summary)
            })?;

        Ok((
            ScanEngine {
                stop,
                thread: Some(thread),
            },
            report_rx,
        ))
    }

    /// Signal the scan loop to stop after the frame in flight.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the scan thread and return its summary.
    pub fn join(mut self) -> Result<ScanSummary, EngineError> {
        self.stop();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| EngineError::ThreadPanicked)?,
            None => Err(EngineError::ThreadPanicked),
        }
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
