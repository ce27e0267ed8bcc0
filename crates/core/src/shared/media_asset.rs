use std::path::{Path, PathBuf};

/// A probed input video. Immutable once opened; each pipeline run owns its own.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Exact source frame rate as `(numerator, denominator)`; `(0, 1)` when
    /// the container does not report one.
    pub frame_rate: (i32, i32),
    /// Container duration in seconds.
    pub duration: f64,
    pub total_frames: usize,
    pub codec: String,
    pub has_audio: bool,
}

impl MediaAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_exact_frame_rate(&self) -> bool {
        self.frame_rate.0 > 0 && self.frame_rate.1 > 0
    }

    /// Best-effort duration: the container value, or frame count over fps
    /// when the container does not report one.
    pub fn effective_duration(&self) -> f64 {
        if self.duration > 0.0 {
            self.duration
        } else if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }
}
