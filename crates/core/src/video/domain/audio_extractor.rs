use std::path::PathBuf;

use thiserror::Error;

use crate::audio::domain::waveform::Waveform;
use crate::shared::media_asset::MediaAsset;

/// Fatal: without audio there is nothing to transcribe or to mux back.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("cannot open {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("{0} has no audio track")]
    NoAudioTrack(PathBuf),
    #[error("audio decode failed for {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Pulls the full audio track of an asset into a normalized waveform.
pub trait AudioExtractor: Send + Sync {
    fn extract(&self, asset: &MediaAsset) -> Result<Waveform, ExtractionError>;
}
