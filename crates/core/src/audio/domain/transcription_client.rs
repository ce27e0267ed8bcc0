use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;

use super::waveform::Waveform;

/// Why a transcription produced no text. Neither kind aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    /// The service could not be reached, timed out, or failed.
    #[error("transcription service unavailable: {0}")]
    Unavailable(String),
    /// The service answered but recognized no speech.
    #[error("transcription ambiguous: {0}")]
    Ambiguous(String),
}

impl TranscriptionError {
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptionError::Unavailable(_) => "unavailable",
            TranscriptionError::Ambiguous(_) => "ambiguous",
        }
    }
}

/// Domain interface for speech-to-text.
///
/// Implementations are free to be slow and non-deterministic; they return
/// the whole track's text in one string.
pub trait TranscriptionClient: Send + Sync {
    fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscriptionError>;

    /// Same as [`transcribe`](Self::transcribe), but stops early once
    /// `abort` is set. Clients that cannot be interrupted ignore the flag.
    fn transcribe_abortable(
        &self,
        waveform: &Waveform,
        abort: Arc<AtomicBool>,
    ) -> Result<String, TranscriptionError> {
        let _ = abort;
        self.transcribe(waveform)
    }
}
