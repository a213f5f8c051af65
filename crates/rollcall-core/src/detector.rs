//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free detection over three stride levels, each emitting score,
//! box-offset and landmark tensors. Input frames are letterboxed into a
//! fixed 640x640 square before inference; decoded boxes are mapped back
//! into frame coordinates.

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const DET_INPUT_SIZE: usize = 640;
const DET_MEAN: f32 = 127.5;
const DET_STD: f32 = 128.0;
const DET_SCORE_THRESHOLD: f32 = 0.5;
const DET_NMS_IOU: f32 = 0.4;
const DET_STRIDES: [usize; 3] = [8, 16, 32];
const DET_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("unexpected model outputs: {0}")]
    BadModelOutputs(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// A detected face in frame coordinates, corner form.
#[derive(Debug, Clone)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    /// Five landmarks: left eye, right eye, nose, mouth corners.
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// How the frame was fitted into the square model input.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// SCRFD-based face detector over a grayscale frame.
pub struct FaceDetector {
    session: Session,
    /// Output tensor index of (score, bbox, kps) per stride level.
    output_map: [(usize, usize, usize); 3],
}

impl FaceDetector {
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();
        if output_names.len() < 9 {
            return Err(DetectorError::BadModelOutputs(format!(
                "need 9 output tensors (3 strides x score/bbox/kps), model has {}",
                output_names.len()
            )));
        }

        // Some exports carry "score_8"/"bbox_16"/"kps_32"-style names; map
        // by name when present, otherwise assume the standard positional
        // layout [scores 8/16/32, bboxes 8/16/32, kps 8/16/32].
        let output_map = map_outputs_by_name(&output_names)
            .unwrap_or([(0, 3, 6), (1, 4, 7), (2, 5, 8)]);

        tracing::info!(path = model_path, outputs = ?output_names, "face detector loaded");
        tracing::debug!(?output_map, "detector output tensor mapping");

        Ok(Self { session, output_map })
    }

    /// Detect faces in a grayscale frame. Zero faces is a normal empty
    /// result. Boxes come back sorted by descending confidence.
    pub fn detect(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBox>, DetectorError> {
        let (tensor, letterbox) = letterbox_tensor(gray, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(tensor.view())?])?;

        let mut candidates = Vec::new();
        for (level, &stride) in DET_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.output_map[level];
            let extract = |idx: usize, what: &str| {
                outputs[idx].try_extract_tensor::<f32>().map_err(|e| {
                    DetectorError::InferenceFailed(format!("{what} at stride {stride}: {e}"))
                })
            };
            let (_, scores) = extract(score_idx, "scores")?;
            let (_, offsets) = extract(bbox_idx, "box offsets")?;
            let (_, kps) = extract(kps_idx, "landmarks")?;

            decode_level(scores, offsets, kps, stride, &letterbox, &mut candidates);
        }

        let mut faces = suppress_overlaps(candidates, DET_NMS_IOU);
        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(faces)
    }
}

/// Find "score_S"/"bbox_S"/"kps_S" output names for every stride.
fn map_outputs_by_name(names: &[String]) -> Option<[(usize, usize, usize); 3]> {
    let position = |prefix: &str, stride: usize| {
        let wanted = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == wanted)
    };

    let mut map = [(0, 0, 0); 3];
    for (level, &stride) in DET_STRIDES.iter().enumerate() {
        map[level] = (
            position("score", stride)?,
            position("bbox", stride)?,
            position("kps", stride)?,
        );
    }
    Some(map)
}

/// Fit the frame into the square model input, padding the borders, and
/// build the normalized NCHW tensor (grayscale replicated across RGB).
fn letterbox_tensor(gray: &[u8], width: usize, height: usize) -> (Array4<f32>, Letterbox) {
    let side = DET_INPUT_SIZE;
    let scale = (side as f32 / width as f32).min(side as f32 / height as f32);
    let fit_w = (width as f32 * scale).round() as usize;
    let fit_h = (height as f32 * scale).round() as usize;
    let pad_x = ((side - fit_w) / 2) as f32;
    let pad_y = ((side - fit_h) / 2) as f32;

    let resized = resize_bilinear(gray, width, height, fit_w, fit_h);

    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    let x0 = pad_x as usize;
    let y0 = pad_y as usize;
    for y in 0..side {
        for x in 0..side {
            let inside = y >= y0 && y < y0 + fit_h && x >= x0 && x < x0 + fit_w;
            // Padding uses the mean value so it normalizes to zero.
            let pixel = if inside {
                resized[(y - y0) * fit_w + (x - x0)] as f32
            } else {
                DET_MEAN
            };
            let v = (pixel - DET_MEAN) / DET_STD;
            tensor[[0, 0, y, x]] = v;
            tensor[[0, 1, y, x]] = v;
            tensor[[0, 2, y, x]] = v;
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

/// Bilinear grayscale resize.
fn resize_bilinear(src: &[u8], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dw * dh];
    let sx_per_dx = sw as f32 / dw as f32;
    let sy_per_dy = sh as f32 / dh as f32;

    for dy in 0..dh {
        let sy = ((dy as f32 + 0.5) * sy_per_dy - 0.5).max(0.0);
        let y0 = (sy as usize).min(sh - 1);
        let y1 = (y0 + 1).min(sh - 1);
        let fy = sy - y0 as f32;

        for dx in 0..dw {
            let sx = ((dx as f32 + 0.5) * sx_per_dx - 0.5).max(0.0);
            let x0 = (sx as usize).min(sw - 1);
            let x1 = (x0 + 1).min(sw - 1);
            let fx = sx - x0 as f32;

            let tl = src[y0 * sw + x0] as f32;
            let tr = src[y0 * sw + x1] as f32;
            let bl = src[y1 * sw + x0] as f32;
            let br = src[y1 * sw + x1] as f32;
            let top = tl + (tr - tl) * fx;
            let bot = bl + (br - bl) * fx;
            dst[dy * dw + dx] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
        }
    }
    dst
}

/// Decode one stride level's tensors into candidate boxes above the score
/// threshold, mapped back into frame coordinates.
fn decode_level(
    scores: &[f32],
    offsets: &[f32],
    kps: &[f32],
    stride: usize,
    letterbox: &Letterbox,
    out: &mut Vec<FaceBox>,
) {
    let grid = DET_INPUT_SIZE / stride;
    let anchors = grid * grid * DET_ANCHORS_PER_CELL;

    for idx in 0..anchors.min(scores.len()) {
        let score = scores[idx];
        if score <= DET_SCORE_THRESHOLD {
            continue;
        }

        let cell = idx / DET_ANCHORS_PER_CELL;
        let cx = (cell % grid) as f32 * stride as f32;
        let cy = (cell / grid) as f32 * stride as f32;

        let b = idx * 4;
        if b + 3 >= offsets.len() {
            continue;
        }
        let (x1, y1) = letterbox.to_frame(
            cx - offsets[b] * stride as f32,
            cy - offsets[b + 1] * stride as f32,
        );
        let (x2, y2) = letterbox.to_frame(
            cx + offsets[b + 2] * stride as f32,
            cy + offsets[b + 3] * stride as f32,
        );

        let k = idx * 10;
        let landmarks = if k + 9 < kps.len() {
            let mut points = [(0.0f32, 0.0f32); 5];
            for (i, point) in points.iter_mut().enumerate() {
                *point = letterbox.to_frame(
                    cx + kps[k + i * 2] * stride as f32,
                    cy + kps[k + i * 2 + 1] * stride as f32,
                );
            }
            Some(points)
        } else {
            None
        };

        out.push(FaceBox {
            x1,
            y1,
            x2,
            y2,
            confidence: score,
            landmarks,
        });
    }
}

/// Greedy non-maximum suppression, highest confidence first.
fn suppress_overlaps(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;

    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32) -> FaceBox {
        FaceBox {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
            landmarks: None,
        }
    }

    #[test]
    fn test_iou_self_is_one() {
        let a = face(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = face(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face(20.0, 20.0, 30.0, 30.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = face(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face(5.0, 0.0, 15.0, 10.0, 1.0);
        // Intersection 50, union 150.
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_drops_overlapping_lower_score() {
        let boxes = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.9),
            face(5.0, 5.0, 105.0, 105.0, 0.8),
            face(200.0, 200.0, 250.0, 250.0, 0.7),
        ];
        let kept = suppress_overlaps(boxes, 0.4);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert!((kept[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let boxes = vec![
            face(0.0, 0.0, 10.0, 10.0, 0.6),
            face(50.0, 50.0, 60.0, 60.0, 0.9),
        ];
        let kept = suppress_overlaps(boxes, 0.4);
        assert_eq!(kept.len(), 2);
        // Reordered by confidence.
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(suppress_overlaps(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_roundtrip() {
        let letterbox = Letterbox {
            scale: 2.0,
            pad_x: 0.0,
            pad_y: 80.0,
        };
        // Frame point (100, 50) → letterboxed (200, 180) → back again.
        let (x, y) = letterbox.to_frame(200.0, 180.0);
        assert!((x - 100.0).abs() < 1e-6);
        assert!((y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_map_outputs_by_name_standard_order() {
        let names: Vec<String> = [
            "score_8", "score_16", "score_32", "bbox_8", "bbox_16", "bbox_32", "kps_8", "kps_16",
            "kps_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(
            map_outputs_by_name(&names),
            Some([(0, 3, 6), (1, 4, 7), (2, 5, 8)])
        );
    }

    #[test]
    fn test_map_outputs_by_name_interleaved() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8", "bbox_16", "kps_16", "score_16", "bbox_32", "kps_32",
            "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(
            map_outputs_by_name(&names),
            Some([(2, 0, 1), (5, 3, 4), (8, 6, 7)])
        );
    }

    #[test]
    fn test_map_outputs_by_name_numeric_names() {
        let names: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(map_outputs_by_name(&names), None);
    }

    #[test]
    fn test_resize_bilinear_uniform_stays_uniform() {
        let src = vec![128u8; 100 * 100];
        let dst = resize_bilinear(&src, 100, 100, 160, 120);
        assert_eq!(dst.len(), 160 * 120);
        assert!(dst.iter().all(|&p| p == 128));
    }

    #[test]
    fn test_resize_bilinear_downscale_dimensions() {
        let src = vec![10u8; 640 * 480];
        let dst = resize_bilinear(&src, 640, 480, 160, 120);
        assert_eq!(dst.len(), 160 * 120);
    }

    #[test]
    fn test_letterbox_tensor_shape_and_padding() {
        // A wide frame gets vertical padding; pad pixels normalize to 0.
        let gray = vec![200u8; 64 * 16];
        let (tensor, letterbox) = letterbox_tensor(&gray, 64, 16);
        assert_eq!(tensor.shape(), &[1, 3, DET_INPUT_SIZE, DET_INPUT_SIZE]);
        assert!(letterbox.pad_y > 0.0);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
    }
}
