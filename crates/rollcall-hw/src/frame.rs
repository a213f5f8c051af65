//! RGB frame type and pixel format conversions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("buffer too short for {width}x{height} {format}: expected {expected}, got {actual}")]
    BufferTooShort {
        width: u32,
        height: u32,
        format: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A captured camera frame, RGB24 (3 bytes per pixel, row-major).
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Grayscale view of the frame (BT.601 luma).
    pub fn to_grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|px| {
                let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// Nearest-neighbor downscale by `factor` in each dimension
    /// (0 < factor ≤ 1). The scanner runs detection on the smaller frame
    /// to bound per-frame cost.
    pub fn downscaled(&self, factor: f32) -> Frame {
        let new_w = ((self.width as f32 * factor).round() as u32).max(1);
        let new_h = ((self.height as f32 * factor).round() as u32).max(1);
        let mut data = Vec::with_capacity((new_w * new_h * 3) as usize);

        for y in 0..new_h {
            let sy = ((y as f32 / factor) as u32).min(self.height - 1);
            for x in 0..new_w {
                let sx = ((x as f32 / factor) as u32).min(self.width - 1);
                data.extend_from_slice(&self.pixel(sx, sy));
            }
        }

        Frame {
            data,
            width: new_w,
            height: new_h,
        }
    }
}

/// Convert packed YUYV 4:2:2 into RGB24 (BT.601).
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V], with U/V shared by
/// the pixel pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Frame, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::BufferTooShort {
            width,
            height,
            format: "YUYV",
            expected,
            actual: yuyv.len(),
        });
    }

    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let u = quad[1] as f32 - 128.0;
        let v = quad[3] as f32 - 128.0;
        for &y in &[quad[0], quad[2]] {
            let y = y as f32;
            let r = y + 1.402 * v;
            let g = y - 0.344 * u - 0.714 * v;
            let b = y + 1.772 * u;
            data.push(r.round().clamp(0.0, 255.0) as u8);
            data.push(g.round().clamp(0.0, 255.0) as u8);
            data.push(b.round().clamp(0.0, 255.0) as u8);
        }
    }

    Ok(Frame {
        data,
        width,
        height,
    })
}

/// Expand an 8-bit grayscale buffer into RGB24.
pub fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<Frame, FrameError> {
    let expected = (width * height) as usize;
    if grey.len() < expected {
        return Err(FrameError::BufferTooShort {
            width,
            height,
            format: "GREY",
            expected,
            actual: grey.len(),
        });
    }

    let mut data = Vec::with_capacity(expected * 3);
    for &g in &grey[..expected] {
        data.extend_from_slice(&[g, g, g]);
    }

    Ok(Frame {
        data,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_maps_to_gray() {
        // U = V = 128 → no chroma, R = G = B = Y.
        let yuyv = vec![100, 128, 200, 128];
        let frame = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(frame.pixel(0, 0), [100, 100, 100]);
        assert_eq!(frame.pixel(1, 0), [200, 200, 200]);
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // High V pushes red above luma.
        let yuyv = vec![128, 128, 128, 255];
        let frame = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        let [r, _, b] = frame.pixel(0, 0);
        assert!(r > 200, "r = {r}");
        assert!(b < 140, "b = {b}");
    }

    #[test]
    fn test_yuyv_too_short() {
        assert!(yuyv_to_rgb(&[0, 0], 2, 1).is_err());
    }

    #[test]
    fn test_grey_to_rgb_replicates_channels() {
        let frame = grey_to_rgb(&[7, 42], 2, 1).unwrap();
        assert_eq!(frame.pixel(0, 0), [7, 7, 7]);
        assert_eq!(frame.pixel(1, 0), [42, 42, 42]);
    }

    #[test]
    fn test_to_grayscale_white_and_black() {
        let frame = Frame {
            data: vec![255, 255, 255, 0, 0, 0],
            width: 2,
            height: 1,
        };
        assert_eq!(frame.to_grayscale(), vec![255, 0]);
    }

    #[test]
    fn test_downscale_quarter() {
        let frame = Frame {
            data: vec![50u8; 640 * 480 * 3],
            width: 640,
            height: 480,
        };
        let small = frame.downscaled(0.25);
        assert_eq!(small.width, 160);
        assert_eq!(small.height, 120);
        assert_eq!(small.data.len(), 160 * 120 * 3);
        assert_eq!(small.pixel(80, 60), [50, 50, 50]);
    }

    #[test]
    fn test_downscale_never_reaches_zero_size() {
        let frame = Frame {
            data: vec![0u8; 3 * 3 * 3],
            width: 3,
            height: 3,
        };
        let small = frame.downscaled(0.1);
        assert_eq!((small.width, small.height), (1, 1));
    }

    #[test]
    fn test_downscale_samples_source_regions() {
        // Left half red, right half blue; halved frame keeps the split.
        let width = 4u32;
        let mut data = Vec::new();
        for _y in 0..2 {
            for x in 0..width {
                if x < 2 {
                    data.extend_from_slice(&[255, 0, 0]);
                } else {
                    data.extend_from_slice(&[0, 0, 255]);
                }
            }
        }
        let frame = Frame {
            data,
            width,
            height: 2,
        };
        let small = frame.downscaled(0.5);
        assert_eq!(small.pixel(0, 0), [255, 0, 0]);
        assert_eq!(small.pixel(1, 0), [0, 0, 255]);
    }
}
