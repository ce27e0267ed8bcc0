use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::transcription_client::{TranscriptionClient, TranscriptionError};
use crate::audio::domain::waveform::Waveform;
use crate::shared::constants::TRANSCRIPTION_SAMPLE_RATE;

/// Local speech-to-text using whisper.cpp via whisper-rs.
///
/// Any inference failure is reported as unavailable; a run that decodes
/// only special tokens is reported as ambiguous.
#[derive(Debug)]
pub struct WhisperTranscriptionClient {
    model_path: PathBuf,
    language: String,
}

impl WhisperTranscriptionClient {
    pub fn new(model_path: &Path, language: &str) -> Result<Self, TranscriptionError> {
        if !model_path.exists() {
            return Err(TranscriptionError::Unavailable(format!(
                "Whisper model not found at: {}",
                model_path.display()
            )));
        }
        Ok(Self {
            model_path: model_path.to_path_buf(),
            language: whisper_language(language),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

/// Whisper wants bare ISO 639-1 codes: "en-US" becomes "en".
fn whisper_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or("en")
        .to_lowercase()
}

impl TranscriptionClient for WhisperTranscriptionClient {
    fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscriptionError> {
        self.transcribe_abortable(waveform, Arc::new(AtomicBool::new(false)))
    }

    fn transcribe_abortable(
        &self,
        waveform: &Waveform,
        abort: Arc<AtomicBool>,
    ) -> Result<String, TranscriptionError> {
        let unavailable = |msg: String| TranscriptionError::Unavailable(msg);

        if waveform.sample_rate() != TRANSCRIPTION_SAMPLE_RATE || waveform.channels() != 1 {
            return Err(unavailable(format!(
                "Whisper needs {TRANSCRIPTION_SAMPLE_RATE} Hz mono, got {} Hz x{}",
                waveform.sample_rate(),
                waveform.channels()
            )));
        }

        let ctx = WhisperContext::new_with_params(
            self.model_path
                .to_str()
                .ok_or_else(|| unavailable("Invalid model path".to_string()))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| unavailable(format!("Failed to load Whisper model: {e}")))?;

        let mut state = ctx
            .create_state()
            .map_err(|e| unavailable(format!("Failed to create Whisper state: {e}")))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 0 });
        params.set_language(Some(self.language.as_str()));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);
        params.set_abort_callback_safe(move || abort.load(Ordering::Relaxed));

        state
            .full(params, waveform.samples())
            .map_err(|e| unavailable(format!("Whisper inference failed: {e}")))?;

        let mut text = String::new();
        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };
            for tok_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(tok_idx) else {
                    continue;
                };
                let Ok(piece) = token.to_str() else {
                    continue;
                };
                // Special tokens look like [_BEG_] or <|endoftext|>
                let trimmed = piece.trim();
                if trimmed.starts_with('[') || trimmed.starts_with('<') {
                    continue;
                }
                text.push_str(piece);
            }
            text.push(' ');
        }

        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(TranscriptionError::Ambiguous(
                "Whisper recognized no speech".to_string(),
            ));
        }
        Ok(normalized)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
