/// Sample rate of the normalized waveform handed to transcription.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16000;

pub const DEFAULT_WORDS_PER_CUE: usize = 4;

pub const DEFAULT_FONT: &str = "Arial";
/// Tried in order when the configured font cannot be found by name.
pub const FALLBACK_FONTS: &[&str] = &["Arial", "DejaVuSans", "LiberationSans", "Helvetica"];
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];
pub const DEFAULT_FONT_SIZE: f32 = 64.0;
pub const MAX_FONT_SIZE: f32 = 1024.0;
pub const MAX_SHADOW_OFFSET: u32 = 256;
pub const DEFAULT_TEXT_COLOR: &str = "white";
pub const DEFAULT_SHADOW_COLOR: &str = "black";
pub const DEFAULT_SHADOW_OFFSET: u32 = 2;

/// Top edge of the subtitle overlay, as a fraction of frame height.
pub const DEFAULT_VERTICAL_POSITION: f64 = 2.0 / 3.0;

pub const DEFAULT_CODEC: &str = "libx264";
pub const OUTPUT_PREFIX: &str = "subtitled_";
pub const SUBTITLE_EXTENSION: &str = "srt";

pub const DEFAULT_TRANSCRIPTION_ENDPOINT: &str = "http://127.0.0.1:9000/transcribe";
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_TRANSCRIPTION_TIMEOUT_SECS: u64 = 30;

pub const SCRATCH_PREFIX: &str = "subburn-";
pub const AUDIO_ARTIFACT_NAME: &str = "audio.wav";
/// Waveforms kept by the extraction cache; the oldest is evicted first.
pub const WAVEFORM_CACHE_CAPACITY: usize = 2;
