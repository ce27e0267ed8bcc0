use image::RgbaImage;

/// A rasterised cue, shown over frames whose time falls in `[start, end)`.
#[derive(Clone, Debug)]
pub struct RenderedOverlay {
    pub cue_index: usize,
    pub start: f64,
    pub end: f64,
    pub image: RgbaImage,
}

impl RenderedOverlay {
    pub fn covers(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
