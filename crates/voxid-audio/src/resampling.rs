//! Audio resampling using rubato

use crate::error::DeviceError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Device-rate samples fed to the filter per call.
const CHUNK_SIZE: usize = 512;

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Stateful mono resampler fed in arbitrary-size blocks.
///
/// One sinc filter carries its history across every block, so a signal
/// fed in pieces resamples exactly like the whole signal fed at once.
/// Input accumulates until a full chunk is available; [`StreamResampler::drain`]
/// pushes the buffered tail and the filter delay through at end of input.
pub struct StreamResampler {
    inner: SincFixedIn<f32>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, DeviceError> {
        let inner = SincFixedIn::<f32>::new(
            target_rate as f64 / source_rate as f64,
            2.0,
            sinc_params(),
            CHUNK_SIZE,
            1, // mono
        )
        .map_err(|e| DeviceError::Resample(e.to_string()))?;

        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }

    /// Feed one block of source-rate samples.
    ///
    /// Returns the output of every full chunk this block completed; the
    /// result is empty while input is still accumulating.
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>, DeviceError> {
        self.pending.extend_from_slice(samples);

        let mut out = Vec::new();
        while self.pending.len() >= CHUNK_SIZE {
            let produced = self
                .inner
                .process(&[&self.pending[..CHUNK_SIZE]], None)
                .map_err(|e| DeviceError::Resample(e.to_string()))?;
            self.pending.drain(..CHUNK_SIZE);
            out.extend(produced.into_iter().next().unwrap_or_default());
        }
        Ok(out)
    }

    /// Resample the buffered tail, then flush the filter delay.
    pub fn drain(mut self) -> Result<Vec<f32>, DeviceError> {
        let mut out = Vec::new();

        if !self.pending.is_empty() {
            let tail = vec![std::mem::take(&mut self.pending)];
            let produced = self
                .inner
                .process_partial(Some(&tail), None)
                .map_err(|e| DeviceError::Resample(e.to_string()))?;
            out.extend(produced.into_iter().next().unwrap_or_default());
        }

        let flushed = self
            .inner
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| DeviceError::Resample(e.to_string()))?;
        out.extend(flushed.into_iter().next().unwrap_or_default());
        Ok(out)
    }
}

/// Resample a complete mono signal from source_rate to target_rate.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, DeviceError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = StreamResampler::new(source_rate, target_rate)?;
    let mut output = resampler.push(samples)?;
    output.extend(resampler.drain()?);
    Ok(output)
}

/// Quantize f32 samples in [-1.0, 1.0] to i16.
pub fn to_i16_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_passthrough() {
        let samples = vec![0.1, -0.2, 0.3];
        let out = resample(&samples, 16_000, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn downsampling_halves_length_approximately() {
        let samples = vec![0.0f32; 32_000];
        let out = resample(&samples, 32_000, 16_000).unwrap();
        // The drained filter delay pads the tail a little past nominal.
        assert!(out.len() >= 15_500 && out.len() <= 16_500);
    }

    #[test]
    fn block_fed_resampling_matches_the_whole_signal() {
        // 100ms of a 440Hz tone at 48kHz.
        let tone: Vec<f32> = (0..4_800)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / 48_000.0).sin() * 0.5)
            .collect();

        let whole = resample(&tone, 48_000, 16_000).unwrap();

        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();
        let mut blocks = Vec::new();
        for block in tone.chunks(480) {
            blocks.extend(resampler.push(block).unwrap());
        }
        blocks.extend(resampler.drain().unwrap());

        // One filter carries state across blocks; chunking must not
        // change the output or lose samples at block boundaries.
        assert_eq!(blocks, whole);
        assert!(blocks.len() >= 1_500 && blocks.len() <= 1_900);
    }

    #[test]
    fn sixteen_bit_round_trip_is_exact() {
        let original: Vec<i16> = vec![0, 1, -1, 100, -100, 2_500, -2_500, 32_767, -32_768];
        let decoded: Vec<f32> = original.iter().map(|&s| s as f32 / 32_768.0).collect();
        assert_eq!(to_i16_samples(&decoded), original);
    }

    #[test]
    fn quantization_clamps_out_of_range() {
        let out = to_i16_samples(&[0.0, 1.0, -1.0, 2.0, -2.0]);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 32767);
        assert_eq!(out[3], 32767);
        assert_eq!(out[4], -32768);
    }
}
