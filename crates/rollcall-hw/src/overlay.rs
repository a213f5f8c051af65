//! Rectangle overlays for annotated scanner frames.

use crate::frame::Frame;

/// RGB color for a recognized face box.
pub const MATCHED_COLOR: [u8; 3] = [0, 255, 0];
/// RGB color for an unrecognized face box.
pub const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0];

/// Draw a rectangle outline onto the frame, clipped to frame bounds.
/// Coordinates may extend outside the frame; out-of-bounds pixels are
/// simply not drawn.
pub fn draw_rect(
    frame: &mut Frame,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: [u8; 3],
    thickness: u32,
) {
    let t = thickness as i32;
    // Two horizontal bands and two vertical bands.
    fill(frame, left, top, right, top + t, color);
    fill(frame, left, bottom - t, right, bottom, color);
    fill(frame, left, top, left + t, bottom, color);
    fill(frame, right - t, top, right, bottom, color);
}

fn fill(frame: &mut Frame, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 3]) {
    let x_start = x0.max(0) as u32;
    let y_start = y0.max(0) as u32;
    let x_end = (x1.max(0) as u32).min(frame.width);
    let y_end = (y1.max(0) as u32).min(frame.height);

    for y in y_start..y_end {
        for x in x_start..x_end {
            let i = ((y * frame.width + x) * 3) as usize;
            frame.data[i..i + 3].copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Frame {
        Frame {
            data: vec![0u8; (width * height * 3) as usize],
            width,
            height,
        }
    }

    #[test]
    fn test_draw_rect_edges_colored_interior_untouched() {
        let mut frame = blank(20, 20);
        draw_rect(&mut frame, 2, 2, 18, 18, MATCHED_COLOR, 2);

        assert_eq!(frame.pixel(2, 2), MATCHED_COLOR);
        assert_eq!(frame.pixel(17, 17), MATCHED_COLOR);
        // Interior stays black.
        assert_eq!(frame.pixel(10, 10), [0, 0, 0]);
        // Outside the rect stays black.
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_draw_rect_clips_to_frame() {
        let mut frame = blank(10, 10);
        // Rect extends well past every edge; must not panic and must
        // still paint the visible portions.
        draw_rect(&mut frame, -5, -5, 15, 15, UNKNOWN_COLOR, 2);
        assert_eq!(frame.pixel(0, 0), UNKNOWN_COLOR);
        assert_eq!(frame.pixel(9, 9), UNKNOWN_COLOR);
        assert_eq!(frame.pixel(5, 5), [0, 0, 0]);
    }

    #[test]
    fn test_draw_rect_fully_outside_is_noop() {
        let mut frame = blank(10, 10);
        draw_rect(&mut frame, 50, 50, 80, 80, MATCHED_COLOR, 2);
        assert!(frame.data.iter().all(|&b| b == 0));
    }
}
