use ndarray::s;

use crate::shared::frame::Frame;
use crate::subtitle::domain::rendered_overlay::RenderedOverlay;

/// Draws the overlay active at each frame's time onto the frame.
///
/// Overlays are kept sorted by cue index; when intervals overlap the lowest
/// index wins. Frames with no active overlay are left untouched, so an empty
/// compositor is the identity.
pub struct FrameCompositor {
    overlays: Vec<RenderedOverlay>,
    fps: f64,
    vertical_position: f64,
}

impl FrameCompositor {
    pub fn new(mut overlays: Vec<RenderedOverlay>, fps: f64, vertical_position: f64) -> Self {
        overlays.sort_by_key(|o| o.cue_index);
        Self {
            overlays,
            fps,
            vertical_position: vertical_position.clamp(0.0, 1.0),
        }
    }

    pub fn passthrough(fps: f64) -> Self {
        Self::new(Vec::new(), fps, 0.0)
    }

    pub fn is_passthrough(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn active_overlay(&self, t: f64) -> Option<&RenderedOverlay> {
        self.overlays.iter().find(|o| o.covers(t))
    }

    /// Returns whether anything was drawn.
    pub fn compose(&self, frame: &mut Frame) -> bool {
        let t = frame.time_at(self.fps);
        let Some(overlay) = self.active_overlay(t) else {
            return false;
        };
        let (left, top) = placement(
            frame.width(),
            frame.height(),
            overlay.width(),
            self.vertical_position,
        );
        blend_overlay(frame, overlay, left, top)
    }
}

/// Top-left corner for an overlay: horizontally centred, top edge at
/// `floor(height * vertical_position)`. May be negative when the overlay is
/// wider than the frame.
pub fn placement(
    frame_width: u32,
    frame_height: u32,
    overlay_width: u32,
    vertical_position: f64,
) -> (i64, i64) {
    let left = (frame_width as i64 - overlay_width as i64).div_euclid(2);
    // Tolerates 2/3 not being exact in binary
    let top = (frame_height as f64 * vertical_position + 1e-9).floor() as i64;
    (left, top)
}

/// Source-over blend of `overlay` onto an opaque RGB frame, clipped to the
/// frame bounds.
fn blend_overlay(frame: &mut Frame, overlay: &RenderedOverlay, left: i64, top: i64) -> bool {
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = (left + overlay.width() as i64).min(fw);
    let y1 = (top + overlay.height() as i64).min(fh);
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    let mut pixels = frame.as_ndarray_mut();
    let mut region = pixels.slice_mut(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize, ..]);

    let (rows, cols, _) = region.dim();
    let (ox, oy) = ((x0 - left) as u32, (y0 - top) as u32);
    for row in 0..rows {
        for col in 0..cols {
            let src = overlay.image.get_pixel(ox + col as u32, oy + row as u32);
            let alpha = src[3] as f32 / 255.0;
            if alpha <= 0.0 {
                continue;
            }
            for c in 0..3 {
                let dst = region[[row, col, c]] as f32;
                let out = src[c] as f32 * alpha + dst * (1.0 - alpha);
                region[[row, col, c]] = out.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rstest::rstest;

    fn overlay(index: usize, start: f64, end: f64, w: u32, h: u32, px: [u8; 4]) -> RenderedOverlay {
        RenderedOverlay {
            cue_index: index,
            start,
            end,
            image: RgbaImage::from_pixel(w, h, Rgba(px)),
        }
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let a = frame.as_ndarray();
        [a[[y, x, 0]], a[[y, x, 1]], a[[y, x, 2]]]
    }

    #[test]
    fn test_passthrough_leaves_frame_unchanged() {
        let compositor = FrameCompositor::passthrough(25.0);
        let mut frame = Frame::filled(32, 24, 3, 77);
        let original = frame.clone();
        assert!(!compositor.compose(&mut frame));
        assert_eq!(frame, original);
        assert!(compositor.is_passthrough());
    }

    #[test]
    fn test_frame_outside_all_intervals_is_unchanged() {
        let compositor =
            FrameCompositor::new(vec![overlay(1, 1.0, 2.0, 4, 2, [255; 4])], 10.0, 2.0 / 3.0);
        // frame 25 at 10 fps is t = 2.5
        let mut frame = Frame::filled(30, 30, 25, 10);
        let original = frame.clone();
        assert!(!compositor.compose(&mut frame));
        assert_eq!(frame, original);
    }

    #[test]
    fn test_overlay_drawn_centred_at_two_thirds() {
        let compositor = FrameCompositor::new(
            vec![overlay(1, 0.0, 1.0, 10, 4, [255, 0, 0, 255])],
            10.0,
            2.0 / 3.0,
        );
        let mut frame = Frame::filled(30, 30, 0, 0);
        assert!(compositor.compose(&mut frame));

        // left = (30 - 10) / 2 = 10, top = floor(30 * 2/3) = 20
        assert_eq!(pixel(&frame, 10, 20), [255, 0, 0]);
        assert_eq!(pixel(&frame, 19, 23), [255, 0, 0]);
        assert_eq!(pixel(&frame, 9, 20), [0, 0, 0]);
        assert_eq!(pixel(&frame, 20, 20), [0, 0, 0]);
        assert_eq!(pixel(&frame, 10, 19), [0, 0, 0]);
        assert_eq!(pixel(&frame, 10, 24), [0, 0, 0]);
    }

    #[test]
    fn test_transparent_overlay_pixels_keep_background() {
        let compositor =
            FrameCompositor::new(vec![overlay(1, 0.0, 1.0, 4, 4, [255, 255, 255, 0])], 10.0, 0.0);
        let mut frame = Frame::filled(8, 8, 0, 50);
        let original = frame.clone();
        compositor.compose(&mut frame);
        assert_eq!(frame, original);
    }

    #[test]
    fn test_half_alpha_mixes_colors() {
        let compositor =
            FrameCompositor::new(vec![overlay(1, 0.0, 1.0, 2, 2, [200, 200, 200, 128])], 10.0, 0.0);
        let mut frame = Frame::filled(2, 2, 0, 0);
        compositor.compose(&mut frame);
        let v = pixel(&frame, 0, 0)[0];
        assert!((99..=101).contains(&v), "got {v}");
    }

    #[test]
    fn test_lowest_cue_index_wins_on_overlap() {
        let compositor = FrameCompositor::new(
            vec![
                overlay(2, 0.0, 2.0, 2, 2, [0, 0, 255, 255]),
                overlay(1, 0.0, 2.0, 2, 2, [0, 255, 0, 255]),
            ],
            10.0,
            0.0,
        );
        assert_eq!(compositor.active_overlay(0.5).unwrap().cue_index, 1);
        let mut frame = Frame::filled(2, 2, 5, 0);
        compositor.compose(&mut frame);
        assert_eq!(pixel(&frame, 0, 0), [0, 255, 0]);
    }

    #[test]
    fn test_interval_end_is_exclusive() {
        let compositor = FrameCompositor::new(
            vec![
                overlay(1, 0.0, 1.0, 1, 1, [255, 0, 0, 255]),
                overlay(2, 1.0, 2.0, 1, 1, [0, 0, 255, 255]),
            ],
            10.0,
            0.0,
        );
        // frame 10 at 10 fps is exactly t = 1.0
        let mut frame = Frame::filled(1, 1, 10, 0);
        compositor.compose(&mut frame);
        assert_eq!(pixel(&frame, 0, 0), [0, 0, 255]);
    }

    #[test]
    fn test_wide_overlay_is_clipped() {
        let compositor =
            FrameCompositor::new(vec![overlay(1, 0.0, 1.0, 20, 20, [9, 9, 9, 255])], 10.0, 0.5);
        let mut frame = Frame::filled(10, 10, 0, 0);
        assert!(compositor.compose(&mut frame));
        assert_eq!(pixel(&frame, 0, 5), [9, 9, 9]);
        assert_eq!(pixel(&frame, 9, 9), [9, 9, 9]);
        assert_eq!(pixel(&frame, 0, 4), [0, 0, 0]);
    }

    #[rstest]
    #[case(1920, 1080, 600, 2.0 / 3.0, (660, 720))]
    #[case(640, 480, 100, 2.0 / 3.0, (270, 320))]
    #[case(100, 99, 101, 0.5, (-1, 49))]
    fn test_placement(
        #[case] fw: u32,
        #[case] fh: u32,
        #[case] ow: u32,
        #[case] vpos: f64,
        #[case] expected: (i64, i64),
    ) {
        assert_eq!(placement(fw, fh, ow, vpos), expected);
    }
}
