use std::path::{Path, PathBuf};

use crate::shared::frame::{Frame, RGB_CHANNELS};
use crate::shared::media_asset::MediaAsset;
use crate::video::domain::video_encoder::{EncodeError, VideoEncoder};

/// Encodes RGB frames with a codec chosen by name, then remuxes the source
/// audio track into the result unmodified.
pub struct FfmpegEncoder {
    codec_name: String,
    output_path: Option<PathBuf>,
    audio_source: Option<PathBuf>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    time_base: ffmpeg_next::Rational,
    frame_count: usize,
    video_stream_index: usize,
}

// SAFETY: owned by the encoder thread for its whole lifetime.
unsafe impl Send for FfmpegEncoder {}

impl FfmpegEncoder {
    pub fn new(codec_name: &str) -> Self {
        Self {
            codec_name: codec_name.to_string(),
            output_path: None,
            audio_source: None,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: ffmpeg_next::Rational(1, FALLBACK_FPS),
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }

    fn io_error(&self, e: impl std::fmt::Display) -> EncodeError {
        EncodeError::Io {
            path: self.output_path.clone().unwrap_or_default(),
            reason: e.to_string(),
        }
    }

    /// Drains every packet the encoder has ready into the container.
    fn drain_packets(&mut self) -> Result<(), EncodeError> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err(EncodeError::NotOpened);
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or(EncodeError::NotOpened)?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded
                .write_interleaved(octx)
                .map_err(|e| EncodeError::Encode(e.to_string()))?;
        }
        Ok(())
    }
}

const FALLBACK_FPS: i32 = 30;

/// Output frame rate as `(num, den)`. Uses the source's exact rate so frame
/// timestamps line up with the copied audio; a bare `fps` is taken to the
/// nearest 1/1000 and 30 fps is assumed when nothing is known.
fn output_frame_rate(asset: &MediaAsset) -> (i32, i32) {
    if asset.has_exact_frame_rate() {
        return asset.frame_rate;
    }
    if asset.fps.is_finite() && asset.fps > 0.0 && asset.fps < 1_000_000.0 {
        let num = (asset.fps * 1000.0).round() as i32;
        if num > 0 {
            let g = gcd(num, 1000);
            return (num / g, 1000 / g);
        }
    }
    (FALLBACK_FPS, 1)
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn open(&mut self, path: &Path, asset: &MediaAsset) -> Result<(), EncodeError> {
        let encode = |e: ffmpeg_next::Error| EncodeError::Encode(e.to_string());
        ffmpeg_next::init().map_err(encode)?;

        let codec = ffmpeg_next::encoder::find_by_name(&self.codec_name)
            .filter(|c| c.medium() == ffmpeg_next::media::Type::Video)
            .ok_or_else(|| EncodeError::UnsupportedCodec(self.codec_name.clone()))?;

        self.width = asset.width;
        self.height = asset.height;
        let (rate_num, rate_den) = output_frame_rate(asset);
        self.time_base = ffmpeg_next::Rational(rate_den, rate_num);
        self.output_path = Some(path.to_path_buf());
        self.audio_source = asset.has_audio.then(|| asset.path.clone());

        let mut octx = ffmpeg_next::format::output(path).map_err(|e| self.io_error(e))?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(Some(codec)).map_err(encode)?;
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(encode)?;

        encoder_ctx.set_width(asset.width);
        encoder_ctx.set_height(asset.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(self.time_base);
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(rate_num, rate_den)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .map_err(|e| {
                EncodeError::UnsupportedCodec(format!("{} ({e})", self.codec_name))
            })?;
        ost.set_parameters(&encoder);
        self.video_stream_index = ost.index();

        octx.write_header().map_err(|e| self.io_error(e))?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            asset.width,
            asset.height,
            ffmpeg_next::format::Pixel::YUV420P,
            asset.width,
            asset.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(encode)?;

        log::debug!(
            "Encoding {}x{} @ {}/{} fps with {} to {}",
            asset.width,
            asset.height,
            rate_num,
            rate_den,
            self.codec_name,
            path.display()
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), EncodeError> {
        let encode = |e: ffmpeg_next::Error| EncodeError::Encode(e.to_string());
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err(EncodeError::NotOpened);
        };
        if frame.width() != self.width || frame.height() != self.height {
            return Err(EncodeError::Encode(format!(
                "frame {} is {}x{}, expected {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );
        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * RGB_CHANNELS;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            dst[start..start + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame).map_err(encode)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));
        encoder.send_frame(&yuv_frame).map_err(encode)?;

        self.drain_packets()?;
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), EncodeError> {
        if self.encoder.is_none() {
            return Ok(());
        }

        if let Some(encoder) = self.encoder.as_mut() {
            encoder
                .send_eof()
                .map_err(|e| EncodeError::Encode(e.to_string()))?;
        }
        self.drain_packets()?;
        if let Some(octx) = self.octx.as_mut() {
            octx.write_trailer().map_err(|e| EncodeError::Io {
                path: self.output_path.clone().unwrap_or_default(),
                reason: e.to_string(),
            })?;
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        if let (Some(source), Some(output)) = (self.audio_source.take(), self.output_path.clone())
        {
            mux_audio(&source, &output).map_err(|e| EncodeError::Io {
                path: output.clone(),
                reason: format!("audio remux failed: {e}"),
            })?;
        }
        Ok(())
    }
}

/// Copies the audio streams of `source` next to the video of `video_output`.
///
/// Packets are stream-copied into a sibling temp file, which then replaces
/// `video_output`. No-op when `source` has no audio.
fn mux_audio(source: &Path, video_output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut ictx_source = ffmpeg_next::format::input(source)?;
    if ictx_source
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .is_none()
    {
        return Ok(());
    }
    let mut ictx_video = ffmpeg_next::format::input(video_output)?;

    let ext = video_output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    let temp_path = video_output.with_extension(format!("mux.{ext}"));

    let mut octx = ffmpeg_next::format::output(&temp_path)?;
    let video_map = copy_streams(&ictx_video, &mut octx, ffmpeg_next::media::Type::Video, 0)?;
    let next_index = video_map.iter().filter(|m| m.is_some()).count();
    let audio_map = copy_streams(
        &ictx_source,
        &mut octx,
        ffmpeg_next::media::Type::Audio,
        next_index,
    )?;

    octx.write_header()?;
    copy_packets(&mut ictx_video, &mut octx, &video_map)?;
    copy_packets(&mut ictx_source, &mut octx, &audio_map)?;
    octx.write_trailer()?;
    drop(octx);

    if let Err(e) = std::fs::rename(&temp_path, video_output) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Adds an output stream for each input stream of `medium`, returning the
/// input-to-output index map.
fn copy_streams(
    ictx: &ffmpeg_next::format::context::Input,
    octx: &mut ffmpeg_next::format::context::Output,
    medium: ffmpeg_next::media::Type,
    first_index: usize,
) -> Result<Vec<Option<usize>>, ffmpeg_next::Error> {
    let mut map = vec![None; ictx.nb_streams() as usize];
    let mut next = first_index;
    for (idx, stream) in ictx.streams().enumerate() {
        if stream.parameters().medium() != medium {
            continue;
        }
        let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
        ost.set_parameters(stream.parameters());
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        map[idx] = Some(next);
        next += 1;
    }
    Ok(map)
}

fn copy_packets(
    ictx: &mut ffmpeg_next::format::context::Input,
    octx: &mut ffmpeg_next::format::context::Output,
    map: &[Option<usize>],
) -> Result<(), ffmpeg_next::Error> {
    let time_bases: Vec<_> = ictx.streams().map(|s| s.time_base()).collect();
    for (stream, mut packet) in ictx.packets() {
        let ist = stream.index();
        let Some(ost) = map.get(ist).copied().flatten() else {
            continue;
        };
        let Some(ost_time_base) = octx.stream(ost).map(|s| s.time_base()) else {
            continue;
        };
        packet.rescale_ts(time_bases[ist], ost_time_base);
        packet.set_position(-1);
        packet.set_stream(ost);
        packet.write_interleaved(octx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_reader::VideoReader;
    use crate::video::infrastructure::ffmpeg_reader::test_support::{
        create_test_video, create_test_video_at_rate,
    };
    use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;

    fn asset(w: u32, h: u32, fps: f64) -> MediaAsset {
        MediaAsset {
            path: PathBuf::from("/nonexistent/source.mp4"),
            width: w,
            height: h,
            fps,
            frame_rate: (0, 1),
            duration: 0.0,
            total_frames: 0,
            codec: String::new(),
            has_audio: false,
        }
    }

    fn stream_seconds(path: &Path, medium: ffmpeg_next::media::Type) -> f64 {
        let ictx = ffmpeg_next::format::input(path).unwrap();
        let stream = ictx.streams().best(medium).unwrap();
        let tb = stream.time_base();
        stream.duration() as f64 * tb.numerator() as f64 / tb.denominator() as f64
    }

    fn has_audio_stream(path: &Path) -> bool {
        let ictx = ffmpeg_next::format::input(path).unwrap();
        let has_audio = ictx.streams().best(ffmpeg_next::media::Type::Audio).is_some();
        has_audio
    }

    #[test]
    fn test_unknown_codec_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = FfmpegEncoder::new("definitely-not-a-codec");
        let result = encoder.open(&dir.path().join("out.mp4"), &asset(160, 120, 25.0));
        assert!(matches!(result, Err(EncodeError::UnsupportedCodec(name)) if name == "definitely-not-a-codec"));
    }

    #[test]
    fn test_audio_codec_name_is_unsupported_for_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = FfmpegEncoder::new("aac");
        let result = encoder.open(&dir.path().join("out.mp4"), &asset(160, 120, 25.0));
        assert!(matches!(result, Err(EncodeError::UnsupportedCodec(_))));
    }

    #[test]
    fn test_write_without_open_is_not_opened() {
        let mut encoder = FfmpegEncoder::new("mpeg4");
        let result = encoder.write(&Frame::filled(160, 120, 0, 128));
        assert!(matches!(result, Err(EncodeError::NotOpened)));
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut encoder = FfmpegEncoder::new("mpeg4");
        assert!(encoder.close().is_ok());
    }

    #[test]
    fn test_mismatched_frame_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = FfmpegEncoder::new("mpeg4");
        encoder
            .open(&dir.path().join("out.mp4"), &asset(160, 120, 25.0))
            .unwrap();
        let result = encoder.write(&Frame::filled(80, 60, 0, 0));
        assert!(matches!(result, Err(EncodeError::Encode(_))));
    }

    #[test]
    fn test_encode_roundtrip_preserves_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut encoder = FfmpegEncoder::new("mpeg4");
        encoder.open(&path, &asset(160, 120, 25.0)).unwrap();
        for i in 0..5 {
            encoder.write(&Frame::filled(160, 120, i, 128)).unwrap();
        }
        encoder.close().unwrap();
        assert_eq!(encoder.frames_written(), 5);

        let mut reader = FfmpegReader::new();
        let read = reader.open(&path).unwrap();
        assert_eq!(read.frame_size(), (160, 120));
        assert!(!read.has_audio);

        let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 5);
        let avg: f64 = frames[0].data().iter().map(|&b| b as f64).sum::<f64>()
            / frames[0].data().len() as f64;
        assert!((avg - 128.0).abs() < 40.0, "average {avg} should be near 128");
    }

    #[test]
    fn test_source_audio_is_carried_over() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        create_test_video(&source, 25, 160, 120, 25, true);
        let source_asset = FfmpegReader::new().open(&source).unwrap();
        assert!(source_asset.has_audio);

        let out = dir.path().join("out.mp4");
        let mut encoder = FfmpegEncoder::new("mpeg4");
        encoder.open(&out, &source_asset).unwrap();
        for i in 0..25 {
            encoder.write(&Frame::filled(160, 120, i, 60)).unwrap();
        }
        encoder.close().unwrap();

        assert!(has_audio_stream(&out));
        assert!(!dir.path().join("out.mux.mp4").exists());
    }

    #[test]
    fn test_output_rate_prefers_exact_source_rate() {
        let mut a = asset(160, 120, 29.97);
        a.frame_rate = (30000, 1001);
        assert_eq!(output_frame_rate(&a), (30000, 1001));
    }

    #[test]
    fn test_output_rate_keeps_fractional_fps() {
        assert_eq!(output_frame_rate(&asset(160, 120, 12.5)), (25, 2));
        assert_eq!(output_frame_rate(&asset(160, 120, 25.0)), (25, 1));
    }

    #[test]
    fn test_output_rate_falls_back_when_unknown() {
        assert_eq!(output_frame_rate(&asset(160, 120, 0.0)), (30, 1));
        assert_eq!(output_frame_rate(&asset(160, 120, f64::NAN)), (30, 1));
    }

    #[test]
    fn test_fractional_frame_rate_stays_aligned_with_audio() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        create_test_video_at_rate(&source, 125, 160, 120, (25, 2), true);

        let mut reader = FfmpegReader::new();
        let source_asset = reader.open(&source).unwrap();
        let out = dir.path().join("out.mp4");
        let mut encoder = FfmpegEncoder::new("mpeg4");
        encoder.open(&out, &source_asset).unwrap();
        for frame in reader.frames() {
            encoder.write(&frame.unwrap()).unwrap();
        }
        encoder.close().unwrap();
        assert_eq!(encoder.frames_written(), 125);

        let frame_secs = 1.0 / 12.5;
        let video = stream_seconds(&out, ffmpeg_next::media::Type::Video);
        let audio = stream_seconds(&out, ffmpeg_next::media::Type::Audio);
        assert!(
            (video - 10.0).abs() <= 2.0 * frame_secs,
            "video lasts {video}s, expected 10s"
        );
        // AAC pads to whole 1024-sample packets
        assert!(
            (video - audio).abs() <= frame_secs + 1024.0 / 16000.0 * 2.0,
            "video {video}s and audio {audio}s drifted apart"
        );
    }
}
