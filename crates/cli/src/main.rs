use std::path::PathBuf;
use std::process;

use clap::Parser;

use subburn_core::pipeline::infrastructure::pipeline_factory::PipelineFactory;
use subburn_core::shared::settings::{Settings, TranscriptionBackend};
use subburn_core::subtitle::domain::subtitle_style::TextColor;

/// Transcribe a video's speech and burn it in as subtitles.
#[derive(Parser, Debug)]
#[command(name = "subburn")]
struct Cli {
    /// Input video file(s).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for outputs (default: next to each input).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/subburn/settings.json if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Words shown per subtitle cue.
    #[arg(long)]
    words_per_cue: Option<usize>,

    /// Font family name or path to a .ttf/.otf file.
    #[arg(long)]
    font: Option<String>,

    /// Font size in pixels.
    #[arg(long)]
    font_size: Option<f32>,

    /// Text colour: a name (white, yellow, ...) or #RRGGBB[AA].
    #[arg(long)]
    color: Option<String>,

    /// Shadow colour: a name or #RRGGBB[AA].
    #[arg(long)]
    shadow_color: Option<String>,

    /// Video codec for the output (ffmpeg encoder name).
    #[arg(long)]
    codec: Option<String>,

    /// Transcription service URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Transcription timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Spoken language tag, e.g. en-US.
    #[arg(long)]
    language: Option<String>,

    /// Transcription backend: http or whisper.
    #[arg(long)]
    backend: Option<String>,

    /// Whisper model file (with --backend whisper).
    #[arg(long)]
    whisper_model: Option<PathBuf>,

    /// Keep the extracted audio as a WAV file in the run's scratch directory.
    #[arg(long)]
    keep_audio: bool,

    /// Print the generated subtitles to stdout.
    #[arg(long)]
    print_srt: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut settings)?;
    settings.validate()?;
    log::debug!("Effective settings: {settings:?}");

    let factory = PipelineFactory::new(settings);
    for input in &cli.inputs {
        let mut use_case = factory
            .build()
            .with_progress(Box::new(|current, total| {
                if total > 0 {
                    eprint!("\rEncoding frame {current}/{total}");
                } else {
                    eprint!("\rEncoding frame {current}");
                }
                true
            }));
        let output = use_case.execute(input);
        eprintln!();
        let output = output?;

        log::info!("Output written to {}", output.video_path.display());
        match &output.subtitle_path {
            Some(path) => log::info!(
                "Subtitles ({} cues) written to {}",
                output.document.len(),
                path.display()
            ),
            None => log::info!("No subtitles generated for {}", input.display()),
        }
        if cli.print_srt {
            print!("{}", output.document.to_srt());
        }
    }

    Ok(())
}

/// Layers command-line flags over the loaded settings.
fn apply_overrides(cli: &Cli, settings: &mut Settings) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.clone());
    }
    if let Some(n) = cli.words_per_cue {
        settings.words_per_cue = n;
    }
    if let Some(font) = &cli.font {
        settings.style.font = font.clone();
    }
    if let Some(size) = cli.font_size {
        settings.style.font_size = size;
    }
    if let Some(color) = &cli.color {
        settings.style.color = TextColor::parse(color)?;
    }
    if let Some(color) = &cli.shadow_color {
        settings.style.shadow_color = TextColor::parse(color)?;
    }
    if let Some(codec) = &cli.codec {
        settings.codec = codec.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        settings.transcription.endpoint = endpoint.clone();
    }
    if let Some(secs) = cli.timeout {
        settings.transcription.timeout_secs = secs;
    }
    if let Some(language) = &cli.language {
        settings.transcription.language = language.clone();
    }
    if let Some(backend) = &cli.backend {
        settings.transcription.backend = parse_backend(backend)?;
    }
    if let Some(model) = &cli.whisper_model {
        settings.transcription.whisper_model = Some(model.clone());
    }
    if cli.keep_audio {
        settings.keep_audio_artifact = true;
    }
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.is_file() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if let Some(n) = cli.words_per_cue {
        if n == 0 {
            return Err("Words per cue must be at least 1".into());
        }
    }
    if let Some(size) = cli.font_size {
        if !size.is_finite() || size <= 0.0 {
            return Err(format!("Font size must be positive, got {size}").into());
        }
    }
    if cli.timeout == Some(0) {
        return Err("Timeout must be at least 1 second".into());
    }
    if let Some(backend) = &cli.backend {
        parse_backend(backend)?;
    }
    Ok(())
}

fn parse_backend(value: &str) -> Result<TranscriptionBackend, String> {
    match value {
        "http" => Ok(TranscriptionBackend::Http),
        "whisper" => Ok(TranscriptionBackend::Whisper),
        other => Err(format!(
            "Backend must be 'http' or 'whisper', got '{other}'"
        )),
    }
}
