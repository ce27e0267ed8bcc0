use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_CODEC, DEFAULT_LANGUAGE, DEFAULT_TRANSCRIPTION_ENDPOINT,
    DEFAULT_TRANSCRIPTION_TIMEOUT_SECS, DEFAULT_WORDS_PER_CUE, MAX_FONT_SIZE, MAX_SHADOW_OFFSET,
    OUTPUT_PREFIX, SUBTITLE_EXTENSION,
};
use crate::subtitle::domain::subtitle_style::SubtitleStyle;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionBackend {
    Http,
    Whisper,
}

impl std::fmt::Display for TranscriptionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionBackend::Http => write!(f, "http"),
            TranscriptionBackend::Whisper => write!(f, "whisper"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub backend: TranscriptionBackend,
    pub endpoint: String,
    pub language: String,
    pub timeout_secs: u64,
    /// Name of an environment variable holding a bearer token, if the
    /// service needs one.
    pub api_key_env: Option<String>,
    pub whisper_model: Option<PathBuf>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            backend: TranscriptionBackend::Http,
            endpoint: DEFAULT_TRANSCRIPTION_ENDPOINT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_TRANSCRIPTION_TIMEOUT_SECS,
            api_key_env: None,
            whisper_model: None,
        }
    }
}

/// Everything a pipeline run needs to know besides the input path.
///
/// Passed explicitly into the pipeline; nothing here is process-global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub words_per_cue: usize,
    pub style: SubtitleStyle,
    pub codec: String,
    pub output_prefix: String,
    /// Where outputs land. Defaults to the input's directory.
    pub output_dir: Option<PathBuf>,
    /// Parent of the per-run scratch directories. Defaults to the system temp dir.
    pub scratch_root: Option<PathBuf>,
    pub keep_audio_artifact: bool,
    pub transcription: TranscriptionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            words_per_cue: DEFAULT_WORDS_PER_CUE,
            style: SubtitleStyle::default(),
            codec: DEFAULT_CODEC.to_string(),
            output_prefix: OUTPUT_PREFIX.to_string(),
            output_dir: None,
            scratch_root: None,
            keep_audio_artifact: false,
            transcription: TranscriptionSettings::default(),
        }
    }
}

impl Settings {
    /// `<config_dir>/subburn/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("subburn").join("settings.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Settings =
            serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads from an explicit file, else from the default location if it
    /// exists, else returns defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.words_per_cue == 0 {
            return Err(SettingsError::Invalid(
                "words_per_cue must be at least 1".into(),
            ));
        }
        if !(self.style.font_size > 0.0 && self.style.font_size <= MAX_FONT_SIZE) {
            return Err(SettingsError::Invalid(format!(
                "font_size must be in (0, {MAX_FONT_SIZE}], got {}",
                self.style.font_size
            )));
        }
        if self.style.shadow_offset > MAX_SHADOW_OFFSET {
            return Err(SettingsError::Invalid(format!(
                "shadow_offset must be at most {MAX_SHADOW_OFFSET}, got {}",
                self.style.shadow_offset
            )));
        }
        if !(0.0..=1.0).contains(&self.style.vertical_position) {
            return Err(SettingsError::Invalid(format!(
                "vertical_position must be between 0.0 and 1.0, got {}",
                self.style.vertical_position
            )));
        }
        if self.codec.trim().is_empty() {
            return Err(SettingsError::Invalid("codec must not be empty".into()));
        }
        if self.transcription.timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "transcription timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    /// `<output_dir or input dir>/<prefix><input file name>`
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.mp4".to_string());
        self.output_dir_for(input)
            .join(format!("{}{name}", self.output_prefix))
    }

    /// `<output_dir or input dir>/<prefix><input stem>.srt`
    pub fn subtitle_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.output_dir_for(input).join(format!(
            "{}{stem}.{SUBTITLE_EXTENSION}",
            self.output_prefix
        ))
    }

    fn output_dir_for(&self, input: &Path) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
