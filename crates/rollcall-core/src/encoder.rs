//! ArcFace face embedding encoder via ONNX Runtime.
//!
//! A detected face is aligned to a canonical 112x112 crop using its five
//! landmarks, then run through the recognition model to produce an
//! L2-normalized 512-dimensional embedding.

use crate::detector::FaceBox;
use crate::types::Embedding;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const EMB_INPUT_SIZE: usize = 112;
const EMB_MEAN: f32 = 127.5;
const EMB_STD: f32 = 127.5;
const EMB_DIM: usize = 512;

/// Canonical landmark positions in the 112x112 crop (InsightFace layout:
/// left eye, right eye, nose, left mouth, right mouth).
const CANONICAL_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face has no landmarks; alignment requires all five")]
    NoLandmarks,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// 4-DOF similarity transform (uniform scale + rotation + translation):
/// dst = [[a, -b], [b, a]] * src + (tx, ty).
#[derive(Debug, Clone, Copy)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Least-squares fit mapping `src` points onto `dst` points.
    ///
    /// Centering both point sets reduces the problem to a closed form:
    /// a and b come from the cross-correlation of the centered sets, the
    /// translation from the difference of means.
    fn fit(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Similarity {
        let n = src.len() as f32;
        let (mut sx_mean, mut sy_mean, mut dx_mean, mut dy_mean) = (0.0, 0.0, 0.0, 0.0);
        for i in 0..src.len() {
            sx_mean += src[i].0;
            sy_mean += src[i].1;
            dx_mean += dst[i].0;
            dy_mean += dst[i].1;
        }
        sx_mean /= n;
        sy_mean /= n;
        dx_mean /= n;
        dy_mean /= n;

        let (mut dot, mut cross, mut norm) = (0.0f32, 0.0f32, 0.0f32);
        for i in 0..src.len() {
            let sx = src[i].0 - sx_mean;
            let sy = src[i].1 - sy_mean;
            let dx = dst[i].0 - dx_mean;
            let dy = dst[i].1 - dy_mean;
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
            norm += sx * sx + sy * sy;
        }

        if norm < 1e-12 {
            // Degenerate landmarks (all coincident); fall back to identity.
            return Similarity {
                a: 1.0,
                b: 0.0,
                tx: 0.0,
                ty: 0.0,
            };
        }

        let a = dot / norm;
        let b = cross / norm;
        Similarity {
            a,
            b,
            tx: dx_mean - (a * sx_mean - b * sy_mean),
            ty: dy_mean - (b * sx_mean + a * sy_mean),
        }
    }

    /// Map a destination point back to the source frame.
    fn invert_point(&self, x: f32, y: f32) -> (f32, f32) {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return (0.0, 0.0);
        }
        let dx = x - self.tx;
        let dy = y - self.ty;
        (
            (self.a * dx + self.b * dy) / det,
            (self.a * dy - self.b * dx) / det,
        )
    }
}

/// Warp the face region into a canonical square crop, sampling the source
/// bilinearly. Out-of-frame samples read as black.
fn align_crop(gray: &[u8], width: usize, height: usize, transform: &Similarity) -> Vec<u8> {
    let size = EMB_INPUT_SIZE;
    let mut crop = vec![0u8; size * size];

    let sample = |x: i32, y: i32| -> f32 {
        if x >= 0 && (x as usize) < width && y >= 0 && (y as usize) < height {
            gray[y as usize * width + x as usize] as f32
        } else {
            0.0
        }
    };

    for oy in 0..size {
        for ox in 0..size {
            let (sx, sy) = transform.invert_point(ox as f32, oy as f32);
            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let top = sample(x0, y0) * (1.0 - fx) + sample(x0 + 1, y0) * fx;
            let bot = sample(x0, y0 + 1) * (1.0 - fx) + sample(x0 + 1, y0 + 1) * fx;
            crop[oy * size + ox] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
        }
    }
    crop
}

/// ArcFace-based embedding encoder.
pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    pub fn load(model_path: &str) -> Result<Self, EncoderError> {
        if !Path::new(model_path).exists() {
            return Err(EncoderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "face encoder loaded");
        Ok(Self { session })
    }

    /// Extract an embedding for one detected face in a grayscale frame.
    /// The face must carry landmarks from the detector.
    pub fn extract(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
        face: &FaceBox,
    ) -> Result<Embedding, EncoderError> {
        let landmarks = face.landmarks.as_ref().ok_or(EncoderError::NoLandmarks)?;

        let transform = Similarity::fit(landmarks, &CANONICAL_LANDMARKS);
        let crop = align_crop(gray, width as usize, height as usize, &transform);
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncoderError::InferenceFailed(format!("embedding output: {e}")))?;

        if raw.len() != EMB_DIM {
            return Err(EncoderError::InferenceFailed(format!(
                "expected {EMB_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw.to_vec()
        };

        Ok(Embedding { values })
    }
}

/// Normalize the aligned grayscale crop into an NCHW tensor, replicating
/// the single channel into RGB.
fn preprocess(crop: &[u8]) -> Array4<f32> {
    let size = EMB_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            let pixel = crop.get(y * size + x).copied().unwrap_or(0) as f32;
            let v = (pixel - EMB_MEAN) / EMB_STD;
            tensor[[0, 0, y, x]] = v;
            tensor[[0, 1, y, x]] = v;
            tensor[[0, 2, y, x]] = v;
        }
    }
    tensor
}
