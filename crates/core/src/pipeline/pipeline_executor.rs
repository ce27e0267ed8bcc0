use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;

use crate::compositing::domain::frame_compositor::FrameCompositor;
use crate::shared::media_asset::MediaAsset;
use crate::video::domain::video_encoder::{EncodeError, VideoEncoder};
use crate::video::domain::video_reader::VideoReader;

/// Per-run execution knobs.
pub struct PipelineConfig {
    /// Called after each composited frame with `(done, total)`; returning
    /// `false` cancels the run.
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to read source frame: {0}")]
    Read(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("cancelled")]
    Cancelled,
}

/// Runs the read → composite → encode stream for one video.
///
/// The reader must already be open on the source. The encoder is opened on
/// `output_path` and closed (muxing the source audio) before returning.
/// Returns the number of frames encoded.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        encoder: Box<dyn VideoEncoder>,
        compositor: FrameCompositor,
        asset: &MediaAsset,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<usize, ExecutionError>;
}
