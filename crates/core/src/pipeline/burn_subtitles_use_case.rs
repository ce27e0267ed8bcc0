use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;

use crate::audio::domain::transcript::Transcript;
use crate::audio::domain::transcription_client::TranscriptionClient;
use crate::compositing::domain::frame_compositor::FrameCompositor;
use crate::shared::constants::AUDIO_ARTIFACT_NAME;
use crate::shared::scratch_space::{ScratchError, ScratchSpace};
use crate::shared::settings::Settings;
use crate::subtitle::domain::cue_renderer::CueRenderer;
use crate::subtitle::domain::rendered_overlay::RenderedOverlay;
use crate::subtitle::domain::subtitle_document::SubtitleDocument;
use crate::subtitle::domain::subtitle_segmenter::SubtitleSegmenter;
use crate::video::domain::audio_extractor::{AudioExtractor, ExtractionError};
use crate::video::domain::video_encoder::{EncodeError, VideoEncoder};
use crate::video::domain::video_reader::VideoReader;

use super::pipeline_executor::{ExecutionError, PipelineConfig, PipelineExecutor};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::pipeline_state::PipelineState;

/// Terminal failure of a run. Transcription and rendering problems never
/// show up here; they degrade the output instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("scratch storage unavailable: {0}")]
    Scratch(#[from] ScratchError),
    #[error("run cancelled")]
    Cancelled,
    #[error("pipeline already executed")]
    AlreadyExecuted,
}

/// What a successful run hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub video_path: PathBuf,
    /// `None` when the document is empty or could not be written.
    pub subtitle_path: Option<PathBuf>,
    pub document: SubtitleDocument,
}

/// The collaborators one run is wired from.
pub struct PipelineComponents {
    pub reader: Box<dyn VideoReader>,
    pub encoder: Box<dyn VideoEncoder>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn TranscriptionClient>,
    pub renderer: Box<dyn CueRenderer>,
    pub executor: Box<dyn PipelineExecutor>,
}

type SharedLogger = Arc<Mutex<Box<dyn PipelineLogger>>>;

/// Burns a transcript of a video's own audio into its frames.
///
/// Drives [`PipelineState`] from `Extracting` to `Done`. Extraction and
/// encoding failures are fatal; an unavailable or ambiguous transcript and
/// cues that fail to render only shrink the subtitle track, down to a plain
/// re-encode of the input. Encoding happens inside a per-run scratch
/// directory and the result is moved into place only once it is complete.
///
/// This is a single-use struct: `execute` consumes the owned components, so
/// calling it twice fails with [`PipelineError::AlreadyExecuted`].
pub struct BurnSubtitlesUseCase {
    reader: Option<Box<dyn VideoReader>>,
    encoder: Option<Box<dyn VideoEncoder>>,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn TranscriptionClient>,
    renderer: Box<dyn CueRenderer>,
    executor: Box<dyn PipelineExecutor>,
    segmenter: SubtitleSegmenter,
    settings: Settings,
    logger: SharedLogger,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
    state: PipelineState,
    history: Vec<PipelineState>,
    stage_started: Instant,
}

impl BurnSubtitlesUseCase {
    pub fn new(components: PipelineComponents, settings: Settings) -> Self {
        Self {
            reader: Some(components.reader),
            encoder: Some(components.encoder),
            extractor: components.extractor,
            transcriber: components.transcriber,
            renderer: components.renderer,
            executor: components.executor,
            segmenter: SubtitleSegmenter::new(settings.words_per_cue),
            settings,
            logger: Arc::new(Mutex::new(Box::new(NullPipelineLogger))),
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            state: PipelineState::Extracting,
            history: Vec::new(),
            stage_started: Instant::now(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Arc::new(Mutex::new(logger));
        self
    }

    pub fn with_progress(mut self, callback: Box<dyn Fn(usize, usize) -> bool + Send>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Shares a flag that cancels the run when set, checked before every
    /// stage and between frames.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_segmenter(mut self, segmenter: SubtitleSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn execute(&mut self, video_path: &Path) -> Result<PipelineOutput, PipelineError> {
        let reader = self.reader.take().ok_or(PipelineError::AlreadyExecuted)?;
        let encoder = self.encoder.take().ok_or(PipelineError::AlreadyExecuted)?;

        self.history.push(self.state);
        self.stage_started = Instant::now();
        let result = self.run(video_path, reader, encoder);

        if let Err(ref e) = result {
            self.with_log(|l| l.info(&format!("Run ended in state {}: {e}", self.state)));
        }
        if let Ok(logger) = self.logger.lock() {
            logger.summary();
        }
        result
    }

    fn run(
        &mut self,
        video_path: &Path,
        mut reader: Box<dyn VideoReader>,
        encoder: Box<dyn VideoEncoder>,
    ) -> Result<PipelineOutput, PipelineError> {
        self.check_cancelled()?;

        // Extracting
        let scratch = ScratchSpace::create(self.settings.scratch_root.as_deref())
            .map_err(|e| self.fail(e.into()))?;
        let asset = reader.open(video_path).map_err(|e| {
            self.fail(
                ExtractionError::Unreadable {
                    path: video_path.to_path_buf(),
                    reason: e.to_string(),
                }
                .into(),
            )
        })?;
        self.with_log(|l| {
            l.info(&format!(
                "Opened {} ({}x{}, {:.2}s, {:.2} fps)",
                video_path.display(),
                asset.width,
                asset.height,
                asset.effective_duration(),
                asset.fps
            ))
        });
        let waveform = self
            .extractor
            .extract(&asset)
            .map_err(|e| self.fail(e.into()))?;
        if self.settings.keep_audio_artifact {
            let artifact = scratch.file(AUDIO_ARTIFACT_NAME);
            if let Err(e) = waveform.write_wav(&artifact) {
                self.with_log(|l| l.warn(&format!("Could not write audio artifact: {e}")));
            }
        }

        // Transcribing
        self.enter(PipelineState::Transcribing)?;
        let transcript = match self.transcriber.transcribe(&waveform) {
            Ok(text) if !text.trim().is_empty() => Transcript::Text(text),
            Ok(_) => {
                self.with_log(|l| l.warn("Transcription ambiguous: empty transcript"));
                Transcript::Unavailable
            }
            Err(e) => {
                let kind = e.kind();
                self.with_log(|l| {
                    l.warn(&format!(
                        "Transcription {kind}, continuing without subtitles: {e}"
                    ))
                });
                Transcript::Unavailable
            }
        };
        drop(waveform);
        self.with_log(|l| l.metric("words", transcript.word_count() as f64));

        // Segmenting
        self.enter(PipelineState::Segmenting)?;
        let document = self
            .segmenter
            .segment(transcript.text(), asset.effective_duration());
        self.with_log(|l| l.metric("cues", document.len() as f64));

        // Rendering
        self.enter(PipelineState::Rendering)?;
        let overlays = self.render_overlays(&document);

        // Compositing
        self.enter(PipelineState::Compositing)?;
        let compositor =
            FrameCompositor::new(overlays, asset.fps, self.settings.style.vertical_position);
        if compositor.is_passthrough() {
            self.with_log(|l| l.info("No subtitles to burn; re-encoding input unchanged"));
        }

        // Encoding
        self.enter(PipelineState::Encoding)?;
        let output_path = self.settings.output_path_for(video_path);
        let scratch_output = scratch.file(
            &output_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output.mp4".to_string()),
        );
        let config = self.pipeline_config();
        let frames = self
            .executor
            .execute(reader, encoder, compositor, &asset, &scratch_output, config)
            .map_err(|e| match e {
                ExecutionError::Cancelled => self.cancel(),
                ExecutionError::Encode(e) => self.fail(e.into()),
                ExecutionError::Read(reason) => self.fail(
                    EncodeError::Encode(format!("source decode failed mid-stream: {reason}"))
                        .into(),
                ),
            })?;
        self.with_log(|l| l.metric("frames", frames as f64));

        self.check_cancelled()?;
        scratch.persist(&scratch_output, &output_path).map_err(|e| {
            self.fail(
                EncodeError::Io {
                    path: output_path.clone(),
                    reason: e.to_string(),
                }
                .into(),
            )
        })?;

        let subtitle_path = self.write_subtitles(&document, video_path);
        self.enter(PipelineState::Done)?;

        if let Err(e) = scratch.close() {
            self.with_log(|l| l.warn(&format!("Could not remove scratch directory: {e}")));
        }
        self.with_log(|l| l.info(&format!("Wrote {}", output_path.display())));

        Ok(PipelineOutput {
            video_path: output_path,
            subtitle_path,
            document,
        })
    }

    /// Renders every cue, dropping the ones that fail.
    fn render_overlays(&self, document: &SubtitleDocument) -> Vec<RenderedOverlay> {
        let mut overlays = Vec::with_capacity(document.len());
        for cue in document.cues() {
            match self.renderer.render(cue) {
                Ok(overlay) => overlays.push(overlay),
                Err(e) => self.with_log(|l| {
                    l.warn(&format!("Dropping cue {} ({:?}): {e}", cue.index, cue.text))
                }),
            }
        }
        self.with_log(|l| l.metric("overlays", overlays.len() as f64));
        overlays
    }

    /// Writes the sidecar SRT. With no cues, a sidecar left by an earlier
    /// run is removed so it never sits next to a passthrough video.
    fn write_subtitles(&self, document: &SubtitleDocument, video_path: &Path) -> Option<PathBuf> {
        let path = self.settings.subtitle_path_for(video_path);
        if document.is_empty() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed stale subtitles {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => self.with_log(|l| {
                    l.warn(&format!(
                        "Could not remove stale subtitles {}: {e}",
                        path.display()
                    ))
                }),
            }
            return None;
        }
        match document.write_srt(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                self.with_log(|l| {
                    l.warn(&format!("Could not write subtitles to {}: {e}", path.display()))
                });
                None
            }
        }
    }

    fn pipeline_config(&mut self) -> PipelineConfig {
        let logger = Arc::clone(&self.logger);
        let user_callback = self.on_progress.take();
        PipelineConfig {
            on_progress: Some(Box::new(move |done, total| {
                if let Ok(mut l) = logger.lock() {
                    l.progress(done, total);
                }
                user_callback.as_ref().map_or(true, |cb| cb(done, total))
            })),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    fn enter(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !next.is_terminal() {
            self.check_cancelled()?;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        self.finish_stage();
        log::debug!("{} -> {next}", self.state);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn check_cancelled(&mut self) -> Result<(), PipelineError> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(self.cancel());
        }
        Ok(())
    }

    fn cancel(&mut self) -> PipelineError {
        self.finish_stage();
        self.state = PipelineState::Cancelled;
        self.history.push(PipelineState::Cancelled);
        PipelineError::Cancelled
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        debug_assert!(self.state.can_fail(), "{} cannot fail", self.state);
        self.finish_stage();
        self.state = PipelineState::Failed;
        self.history.push(PipelineState::Failed);
        error
    }

    /// Records how long the current state ran.
    fn finish_stage(&mut self) {
        let elapsed_ms = self.stage_started.elapsed().as_secs_f64() * 1000.0;
        let stage = self.state;
        self.with_log(|l| l.timing(stage.name(), elapsed_ms));
        self.stage_started = Instant::now();
    }

    fn with_log(&self, f: impl FnOnce(&mut dyn PipelineLogger)) {
        if let Ok(mut logger) = self.logger.lock() {
            f(&mut **logger);
        }
    }
}
