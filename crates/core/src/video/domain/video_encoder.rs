use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::media_asset::MediaAsset;

/// Fatal: there is no fallback for a failed final encode.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("unsupported video codec '{0}'")]
    UnsupportedCodec(String),
    #[error("encoder not opened")]
    NotOpened,
    #[error("failed to write {path}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Serializes composited frames to an output file.
///
/// The original audio track of `asset` is carried over unmodified when the
/// encoder is closed.
pub trait VideoEncoder: Send {
    fn open(&mut self, path: &Path, asset: &MediaAsset) -> Result<(), EncodeError>;

    fn write(&mut self, frame: &Frame) -> Result<(), EncodeError>;

    /// Flushes the encoder and muxes the source audio.
    fn close(&mut self) -> Result<(), EncodeError>;
}
