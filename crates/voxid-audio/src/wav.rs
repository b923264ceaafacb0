//! WAV file input using hound

use crate::error::DeviceError;
use crate::resampling;
use crate::source::{AudioInput, AudioSource};
use crate::SAMPLE_RATE;
use hound::WavReader;
use std::path::{Path, PathBuf};

/// Opens file-backed sources over a single WAV file.
///
/// Lets every session run against recorded audio instead of a live
/// device; `read` past the end reports `EndOfStream`.
pub struct WavInput {
    path: PathBuf,
}

impl WavInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AudioInput for WavInput {
    fn open(&self, frame_length: usize) -> Result<Box<dyn AudioSource>, DeviceError> {
        let samples = load_wav_16k(&self.path)?;
        tracing::info!(
            "WAV input: {} ({} samples at {}Hz)",
            self.path.display(),
            samples.len(),
            SAMPLE_RATE
        );
        Ok(Box::new(WavSource {
            samples,
            position: 0,
            frame_length,
            started: false,
        }))
    }
}

/// File-backed source serving pre-decoded frames.
pub struct WavSource {
    samples: Vec<i16>,
    position: usize,
    frame_length: usize,
    started: bool,
}

impl AudioSource for WavSource {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        self.started = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<i16>, DeviceError> {
        if !self.started {
            return Err(DeviceError::NotStarted);
        }
        // A trailing partial frame is dropped; frames are always exact.
        if self.position + self.frame_length > self.samples.len() {
            return Err(DeviceError::EndOfStream);
        }
        let frame = self.samples[self.position..self.position + self.frame_length].to_vec();
        self.position += self.frame_length;
        Ok(frame)
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

/// Load a WAV file as mono i16 at 16kHz.
fn load_wav_16k(path: &Path) -> Result<Vec<i16>, DeviceError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(|s| s.ok())
            .collect(),
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
    };

    // Convert to mono
    let mono: Vec<f32> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    let resampled = resampling::resample(&mono, source_rate, SAMPLE_RATE)?;
    Ok(resampling::to_i16_samples(&resampled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_mono_i16(path: &Path, samples: &[i16], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn serves_exact_frames_then_end_of_stream() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_mono_i16(&path, &vec![100i16; 250], SAMPLE_RATE);

        let mut source = WavInput::new(&path).open(100).unwrap();
        source.start().unwrap();

        let first = source.read().unwrap();
        assert_eq!(first.len(), 100);
        assert_eq!(first[0], 100);
        source.read().unwrap();
        // 50 samples remain, less than a frame.
        assert!(matches!(source.read(), Err(DeviceError::EndOfStream)));
        source.stop();
    }

    #[test]
    fn read_before_start_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_mono_i16(&path, &[0i16; 200], SAMPLE_RATE);

        let mut source = WavInput::new(&path).open(100).unwrap();
        assert!(matches!(source.read(), Err(DeviceError::NotStarted)));
    }

    #[test]
    fn stereo_float_input_is_downmixed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..160 {
            writer.write_sample(0.5f32).unwrap();
            writer.write_sample(-0.5f32).unwrap();
        }
        writer.finalize().unwrap();

        let mut source = WavInput::new(&path).open(160).unwrap();
        source.start().unwrap();
        let frame = source.read().unwrap();
        // Channels cancel out after averaging.
        assert!(frame.iter().all(|&s| s == 0));
    }

    #[test]
    fn missing_file_reports_wav_error() {
        let result = WavInput::new("/nonexistent/audio.wav").open(160);
        assert!(matches!(result, Err(DeviceError::Wav(_))));
    }
}
