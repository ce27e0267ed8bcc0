use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Decoded audio: interleaved PCM samples normalized to [-1.0, 1.0].
///
/// Samples are shared, so clones do not copy the track.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Encodes as a 16-bit PCM WAV in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.wav_spec())?;
            self.write_samples(&mut writer)?;
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Writes a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let mut writer = hound::WavWriter::create(path, self.wav_spec())?;
        self.write_samples(&mut writer)?;
        writer.finalize()
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_samples<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut hound::WavWriter<W>,
    ) -> Result<(), hound::Error> {
        for &s in self.samples.iter() {
            let clamped = s.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clone_shares_samples() {
        let w = Waveform::new(vec![0.25; 16000], 16000, 1);
        let copy = w.clone();
        assert!(std::ptr::eq(w.samples().as_ptr(), copy.samples().as_ptr()));
        assert_eq!(w, copy);
    }

    #[test]
    fn test_duration_mono() {
        let w = Waveform::new(vec![0.0; 48000], 16000, 1);
        assert_relative_eq!(w.duration(), 3.0);
    }

    #[test]
    fn test_duration_stereo() {
        let w = Waveform::new(vec![0.0; 96000], 48000, 2);
        assert_relative_eq!(w.duration(), 1.0);
    }

    #[test]
    fn test_duration_zero_rate_is_zero() {
        let w = Waveform::new(vec![0.0; 10], 0, 1);
        assert_eq!(w.duration(), 0.0);
    }

    #[test]
    fn test_wav_bytes_have_riff_header_and_sample_payload() {
        let w = Waveform::new(vec![0.0, 0.5, -0.5, 1.0], 16000, 1);
        let bytes = w.to_wav_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte canonical header + 4 samples * 2 bytes
        assert_eq!(bytes.len(), 44 + 8);
    }

    #[test]
    fn test_wav_clamps_out_of_range_samples() {
        let w = Waveform::new(vec![2.0, -3.0], 16000, 1);
        let bytes = w.to_wav_bytes().unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_write_wav_file_reports_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        Waveform::new(vec![0.1; 1600], 16000, 1)
            .write_wav(&path)
            .unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 1600);
    }
}
