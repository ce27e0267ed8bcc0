use thiserror::Error;

use crate::subtitle::domain::rendered_overlay::RenderedOverlay;
use crate::subtitle::domain::subtitle_cue::SubtitleCue;

/// Fatal for one cue only; the run drops that cue and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("font unavailable: {0}")]
    FontUnavailable(String),
    #[error("font file is not a valid TrueType/OpenType font: {0}")]
    InvalidFont(String),
    #[error("cue {0} has no drawable text")]
    EmptyText(usize),
    #[error("cue {0} is too large to draw")]
    CanvasTooLarge(usize),
}

/// Turns a cue into a timed overlay image (shadow and foreground layers).
pub trait CueRenderer: Send + Sync {
    fn render(&self, cue: &SubtitleCue) -> Result<RenderedOverlay, RenderError>;
}
