use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::shared::font_resolver;
use crate::subtitle::domain::cue_renderer::{CueRenderer, RenderError};
use crate::subtitle::domain::rendered_overlay::RenderedOverlay;
use crate::subtitle::domain::subtitle_cue::SubtitleCue;
use crate::subtitle::domain::subtitle_style::{SubtitleStyle, TextColor};

/// Blank border around the text so glyph overhangs are not clipped.
const PADDING: u32 = 2;

/// Largest overlay side in pixels.
const MAX_CANVAS_SIDE: u32 = 16_384;

/// Rasterises cue text with ab_glyph.
///
/// The shadow is drawn first, displaced by `shadow_offset` pixels right and
/// down, then the foreground on top. The font is resolved and parsed once;
/// if that fails every cue reports the same [`RenderError`].
pub struct GlyphCueRenderer {
    font: Result<FontVec, RenderError>,
    style: SubtitleStyle,
}

impl GlyphCueRenderer {
    pub fn new(style: SubtitleStyle) -> Self {
        let font = load_font(&style.font);
        if let Err(ref e) = font {
            log::warn!("Subtitle font unavailable, cues will not be drawn: {e}");
        }
        Self { font, style }
    }

    pub fn from_font_bytes(data: Vec<u8>, style: SubtitleStyle) -> Self {
        let font = FontVec::try_from_vec(data)
            .map_err(|e| RenderError::InvalidFont(format!("<memory>: {e}")));
        Self { font, style }
    }

    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    pub fn is_ready(&self) -> bool {
        self.font.is_ok()
    }
}

fn load_font(name: &str) -> Result<FontVec, RenderError> {
    let path = font_resolver::resolve(name)
        .map_err(|e| RenderError::FontUnavailable(e.to_string()))?;
    let data = std::fs::read(&path)
        .map_err(|e| RenderError::FontUnavailable(format!("{}: {e}", path.display())))?;
    log::debug!("Loaded subtitle font {}", path.display());
    FontVec::try_from_vec(data)
        .map_err(|e| RenderError::InvalidFont(format!("{}: {e}", path.display())))
}

impl CueRenderer for GlyphCueRenderer {
    fn render(&self, cue: &SubtitleCue) -> Result<RenderedOverlay, RenderError> {
        let font = self.font.as_ref().map_err(Clone::clone)?;
        if cue.text.trim().is_empty() {
            return Err(RenderError::EmptyText(cue.index));
        }

        let scale = PxScale::from(self.style.font_size);
        let scaled = font.as_scaled(scale);
        let text_width = line_width(font, scale, &cue.text);
        let text_height = scaled.ascent() - scaled.descent();

        let offset = self.style.shadow_offset;
        let (Some(width), Some(height)) = (
            canvas_side(text_width, offset),
            canvas_side(text_height, offset),
        ) else {
            return Err(RenderError::CanvasTooLarge(cue.index));
        };
        let mut canvas = RgbaImage::new(width.max(1), height.max(1));

        let origin = PADDING as f32;
        let shadow_origin = origin + offset as f32;
        if offset > 0 {
            draw_line(
                &mut canvas,
                font,
                scale,
                &cue.text,
                (shadow_origin, shadow_origin),
                self.style.shadow_color,
            );
        }
        draw_line(
            &mut canvas,
            font,
            scale,
            &cue.text,
            (origin, origin),
            self.style.color,
        );

        Ok(RenderedOverlay {
            cue_index: cue.index,
            start: cue.start_secs(),
            end: cue.end_secs(),
            image: canvas,
        })
    }
}

/// Canvas extent for `extent` pixels of text plus shadow and padding, or
/// `None` past [`MAX_CANVAS_SIDE`].
fn canvas_side(extent: f32, offset: u32) -> Option<u32> {
    if !extent.is_finite() || extent < 0.0 || extent > MAX_CANVAS_SIDE as f32 {
        return None;
    }
    (extent.ceil() as u32)
        .checked_add(offset)?
        .checked_add(PADDING * 2)
        .filter(|&side| side <= MAX_CANVAS_SIDE)
}

fn line_width(font: &FontVec, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0f32;
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        caret += scaled.h_advance(id);
        previous = Some(id);
    }
    caret
}

/// Draws one line of text whose top-left corner sits at `origin`.
fn draw_line(
    canvas: &mut RgbaImage,
    font: &FontVec,
    scale: PxScale,
    text: &str,
    origin: (f32, f32),
    color: TextColor,
) {
    let scaled = font.as_scaled(scale);
    let baseline = origin.1 + scaled.ascent();
    let mut caret = origin.0;
    let mut previous = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|x, y, coverage| {
            let px = bounds.min.x as i64 + x as i64;
            let py = bounds.min.y as i64 + y as i64;
            if px < 0 || py < 0 || px >= canvas.width() as i64 || py >= canvas.height() as i64 {
                return;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            blend_over(dst, color, coverage);
        });
    }
}

/// Source-over compositing onto a straight-alpha pixel.
fn blend_over(dst: &mut Rgba<u8>, color: TextColor, coverage: f32) {
    let [r, g, b, a] = color.rgba();
    let src_a = (a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    let mix = |s: u8, d: u8| {
        let v = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(r, dst[0]),
        mix(g, dst[1]),
        mix(b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]);
}
