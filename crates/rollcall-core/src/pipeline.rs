//! Detector + encoder composed into a single detect-and-embed step.

use crate::detector::{DetectorError, FaceDetector};
use crate::encoder::{EncoderError, FaceEncoder};
use crate::types::{Detection, Embedding, FaceLocation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("encoder: {0}")]
    Encoder(#[from] EncoderError),
}

/// Runs detection and embedding extraction over a grayscale frame.
pub struct FacePipeline {
    detector: FaceDetector,
    encoder: FaceEncoder,
}

impl FacePipeline {
    /// Load both ONNX models. Fails fast if either file is missing.
    pub fn load(detector_path: &str, encoder_path: &str) -> Result<Self, PipelineError> {
        Ok(Self {
            detector: FaceDetector::load(detector_path)?,
            encoder: FaceEncoder::load(encoder_path)?,
        })
    }

    /// Detect faces only, without embedding extraction. Enrollment uses
    /// this to pick the best-confidence capture before committing to an
    /// embedding.
    pub fn detect(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<crate::detector::FaceBox>, PipelineError> {
        Ok(self.detector.detect(gray, width, height)?)
    }

    /// Detect every face in the frame and extract an embedding per face.
    ///
    /// Zero faces is a normal empty result. A face the detector returns
    /// without landmarks cannot be aligned and is skipped with a warning
    /// rather than failing the whole frame.
    pub fn detect_and_embed(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, PipelineError> {
        let faces = self.detector.detect(gray, width, height)?;
        let mut detections = Vec::with_capacity(faces.len());

        for face in &faces {
            let embedding: Embedding = match self.encoder.extract(gray, width, height, face) {
                Ok(embedding) => embedding,
                Err(EncoderError::NoLandmarks) => {
                    tracing::warn!(
                        confidence = face.confidence,
                        "face without landmarks, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            detections.push(Detection {
                location: FaceLocation {
                    top: face.y1,
                    right: face.x2,
                    bottom: face.y2,
                    left: face.x1,
                },
                embedding,
            });
        }

        Ok(detections)
    }
}
