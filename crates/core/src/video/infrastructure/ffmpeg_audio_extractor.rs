use crate::audio::domain::waveform::Waveform;
use crate::shared::constants::TRANSCRIPTION_SAMPLE_RATE;
use crate::shared::media_asset::MediaAsset;
use crate::video::domain::audio_extractor::{AudioExtractor, ExtractionError};

/// Decodes the best audio stream with ffmpeg-next, downmixed and resampled
/// to mono f32 at the configured rate.
pub struct FfmpegAudioExtractor {
    sample_rate: u32,
}

impl FfmpegAudioExtractor {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Default for FfmpegAudioExtractor {
    fn default() -> Self {
        Self::new(TRANSCRIPTION_SAMPLE_RATE)
    }
}

impl AudioExtractor for FfmpegAudioExtractor {
    fn extract(&self, asset: &MediaAsset) -> Result<Waveform, ExtractionError> {
        let path = asset.path();
        let unreadable = |e: ffmpeg_next::Error| ExtractionError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let decode = |e: ffmpeg_next::Error| ExtractionError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        ffmpeg_next::init().map_err(unreadable)?;
        let mut ictx = ffmpeg_next::format::input(path).map_err(unreadable)?;

        let audio_stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| ExtractionError::NoAudioTrack(path.to_path_buf()))?;
        let audio_stream_index = audio_stream.index();

        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(audio_stream.parameters())
                .map_err(decode)?;
        let mut decoder = codec_ctx.decoder().audio().map_err(decode)?;

        let mut resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Planar),
            ffmpeg_next::ChannelLayout::MONO,
            self.sample_rate,
        )
        .map_err(decode)?;

        let mut samples: Vec<f32> = Vec::new();
        let mut decoded = ffmpeg_next::util::frame::audio::Audio::empty();
        let mut resampled = ffmpeg_next::util::frame::audio::Audio::empty();

        for (stream, packet) in ictx.packets() {
            if stream.index() != audio_stream_index {
                continue;
            }
            decoder.send_packet(&packet).map_err(decode)?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                resampler.run(&decoded, &mut resampled).map_err(decode)?;
                extract_f32_samples(&resampled, &mut samples);
            }
        }

        decoder.send_eof().map_err(decode)?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler.run(&decoded, &mut resampled).map_err(decode)?;
            extract_f32_samples(&resampled, &mut samples);
        }

        // The resampler may still hold buffered samples
        if let Ok(Some(delay)) = resampler.flush(&mut resampled) {
            if delay.output > 0 {
                extract_f32_samples(&resampled, &mut samples);
            }
        }

        log::debug!(
            "Extracted {} samples ({:.2}s) from {}",
            samples.len(),
            samples.len() as f64 / self.sample_rate as f64,
            path.display()
        );

        Ok(Waveform::new(samples, self.sample_rate, 1))
    }
}

/// Appends the f32 samples of a planar mono frame.
fn extract_f32_samples(frame: &ffmpeg_next::util::frame::audio::Audio, out: &mut Vec<f32>) {
    let num_samples = frame.samples();
    if num_samples == 0 {
        return;
    }
    out.extend_from_slice(&frame.plane::<f32>(0)[..num_samples]);
}
