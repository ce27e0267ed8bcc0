use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::domain::transcription_client::{TranscriptionClient, TranscriptionError};
use crate::audio::domain::waveform::Waveform;
use crate::audio::infrastructure::http_transcription_client::HttpTranscriptionClient;
use crate::audio::infrastructure::timeout_transcription_client::TimeoutTranscriptionClient;
use crate::pipeline::burn_subtitles_use_case::{
    BurnSubtitlesUseCase, PipelineComponents, PipelineError, PipelineOutput,
};
use crate::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use crate::pipeline::pipeline_logger::StdoutPipelineLogger;
use crate::shared::settings::{Settings, TranscriptionBackend, TranscriptionSettings};
use crate::subtitle::infrastructure::glyph_cue_renderer::GlyphCueRenderer;
use crate::video::domain::audio_extractor::AudioExtractor;
use crate::video::infrastructure::caching_audio_extractor::CachingAudioExtractor;
use crate::video::infrastructure::ffmpeg_audio_extractor::FfmpegAudioExtractor;
use crate::video::infrastructure::ffmpeg_encoder::FfmpegEncoder;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;

/// Wires runs from settings with the ffmpeg, HTTP/Whisper and ab_glyph
/// adapters.
///
/// The audio extractor and transcription client are shared by every run the
/// factory builds, so repeated runs on an unchanged file reuse its waveform.
pub struct PipelineFactory {
    settings: Settings,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn TranscriptionClient>,
}

impl PipelineFactory {
    pub fn new(settings: Settings) -> Self {
        let extractor: Arc<dyn AudioExtractor> = Arc::new(CachingAudioExtractor::new(Box::new(
            FfmpegAudioExtractor::default(),
        )));
        let transcriber = build_transcriber(&settings.transcription);
        Self {
            settings,
            extractor,
            transcriber,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn build(&self) -> BurnSubtitlesUseCase {
        let components = PipelineComponents {
            reader: Box::new(FfmpegReader::new()),
            encoder: Box::new(FfmpegEncoder::new(&self.settings.codec)),
            extractor: Arc::clone(&self.extractor),
            transcriber: Arc::clone(&self.transcriber),
            renderer: Box::new(GlyphCueRenderer::new(self.settings.style.clone())),
            executor: Box::new(ThreadedPipelineExecutor::new()),
        };
        BurnSubtitlesUseCase::new(components, self.settings.clone())
            .with_logger(Box::new(StdoutPipelineLogger::default()))
    }

    pub fn run(&self, video_path: &Path) -> Result<PipelineOutput, PipelineError> {
        self.build().execute(video_path)
    }
}

/// Runs the whole pipeline on one video with the default adapters.
pub fn run(video_path: &Path, settings: &Settings) -> Result<PipelineOutput, PipelineError> {
    PipelineFactory::new(settings.clone()).run(video_path)
}

/// Builds the configured backend behind a wall-clock timeout. A backend that
/// cannot be constructed becomes a client that always reports unavailable,
/// so runs still complete without subtitles.
pub fn build_transcriber(settings: &TranscriptionSettings) -> Arc<dyn TranscriptionClient> {
    let timeout = Duration::from_secs(settings.timeout_secs.max(1));
    let backend = match settings.backend {
        TranscriptionBackend::Http => build_http(settings, timeout),
        TranscriptionBackend::Whisper => build_whisper(settings),
    };
    match backend {
        Ok(client) => Arc::new(TimeoutTranscriptionClient::new(client, timeout)),
        Err(e) => {
            log::warn!("Transcription backend '{}' unavailable: {e}", settings.backend);
            Arc::new(UnavailableTranscriptionClient(e.to_string()))
        }
    }
}

fn build_http(
    settings: &TranscriptionSettings,
    timeout: Duration,
) -> Result<Arc<dyn TranscriptionClient>, TranscriptionError> {
    let mut client = HttpTranscriptionClient::new(&settings.endpoint, &settings.language, timeout)?;
    if let Some(var) = &settings.api_key_env {
        match std::env::var(var) {
            Ok(key) if !key.is_empty() => client = client.with_api_key(key),
            _ => log::warn!("API key variable {var} is not set; sending unauthenticated"),
        }
    }
    Ok(Arc::new(client))
}

#[cfg(feature = "whisper")]
fn build_whisper(
    settings: &TranscriptionSettings,
) -> Result<Arc<dyn TranscriptionClient>, TranscriptionError> {
    use crate::audio::infrastructure::whisper_transcription_client::WhisperTranscriptionClient;

    let model = settings.whisper_model.as_deref().ok_or_else(|| {
        TranscriptionError::Unavailable("no whisper_model configured".to_string())
    })?;
    Ok(Arc::new(WhisperTranscriptionClient::new(
        model,
        &settings.language,
    )?))
}

#[cfg(not(feature = "whisper"))]
fn build_whisper(
    _settings: &TranscriptionSettings,
) -> Result<Arc<dyn TranscriptionClient>, TranscriptionError> {
    Err(TranscriptionError::Unavailable(
        "built without the 'whisper' feature".to_string(),
    ))
}

/// Stand-in for a backend that failed to initialise.
struct UnavailableTranscriptionClient(String);

impl TranscriptionClient for UnavailableTranscriptionClient {
    fn transcribe(&self, _waveform: &Waveform) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::Unavailable(self.0.clone()))
    }
}
