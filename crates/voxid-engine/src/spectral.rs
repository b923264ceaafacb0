//! Builtin spectral speaker engine
//!
//! Models a speaker as the normalized mean of log-mel filterbank vectors
//! over voiced audio and scores frames by cosine similarity against that
//! embedding. Everything is deterministic: the same audio always produces
//! the same profile bytes and the same scores.

use crate::error::EngineError;
use crate::profile::SpeakerProfile;
use crate::traits::{SpeakerProfiler, SpeakerRecognizer, VoiceEngine};
use realfft::{num_complex::Complex, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;
use voxid_types::{EnrollFeedback, EnrollUpdate};

/// Sample rate the engine expects, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per enrollment frame (0.5s at 16kHz).
const ENROLL_FRAME_SAMPLES: usize = 8_000;
/// Samples per recognition frame (32ms at 16kHz).
const RECOGNIZE_FRAME_SAMPLES: usize = 512;

/// Analysis window length: 25ms.
const WIN_LENGTH: usize = 400;
/// Analysis window hop: 10ms.
const FRAME_SHIFT: usize = 160;
const N_FFT: usize = 512;
const N_MELS: usize = 40;

/// RMS below this (on [-1, 1] samples) counts as silence.
const VOICE_RMS: f32 = 0.01;
/// Fraction of clipped samples above which a frame is rejected.
const MAX_CLIP_RATIO: f32 = 0.02;
/// Voiced analysis windows required for a complete profile (10s of speech).
const TARGET_VOICED_WINDOWS: usize = 1_000;
/// Voiced analysis windows of context kept while recognizing (1s).
const CONTEXT_WINDOWS: usize = 100;

const PROFILE_VERSION: u32 = 1;

// ============================================================================
// Engine
// ============================================================================

/// Factory for the builtin profiler and recognizer.
pub struct SpectralEngine;

impl SpectralEngine {
    /// Empty credentials are rejected at construction; the builtin engine
    /// makes no further use of the value.
    pub fn new(credential: &str) -> Result<Self, EngineError> {
        if credential.trim().is_empty() {
            return Err(EngineError::InvalidCredential);
        }
        Ok(Self)
    }
}

impl VoiceEngine for SpectralEngine {
    fn create_profiler(&self) -> Result<Box<dyn SpeakerProfiler>, EngineError> {
        Ok(Box::new(SpectralProfiler::new()))
    }

    fn create_recognizer(
        &self,
        profiles: &[SpeakerProfile],
    ) -> Result<Box<dyn SpeakerRecognizer>, EngineError> {
        let mut embeddings = Vec::with_capacity(profiles.len());
        for (index, profile) in profiles.iter().enumerate() {
            let payload: ProfilePayload = serde_json::from_slice(profile.to_bytes())
                .map_err(|e| EngineError::InvalidProfile {
                    index,
                    message: e.to_string(),
                })?;
            if payload.version != PROFILE_VERSION {
                return Err(EngineError::InvalidProfile {
                    index,
                    message: format!("unsupported profile version {}", payload.version),
                });
            }
            if payload.num_mels != N_MELS || payload.embedding.len() != N_MELS {
                return Err(EngineError::InvalidProfile {
                    index,
                    message: "embedding size mismatch".to_string(),
                });
            }
            embeddings.push(payload.embedding);
        }

        tracing::debug!("Recognizer created with {} profile(s)", embeddings.len());
        Ok(Box::new(SpectralRecognizer::new(embeddings)))
    }
}

/// Serialized profile payload.
#[derive(Debug, Serialize, Deserialize)]
struct ProfilePayload {
    version: u32,
    sample_rate: u32,
    num_mels: usize,
    embedding: Vec<f32>,
}

// ============================================================================
// Profiler
// ============================================================================

/// Accumulates a mean log-mel embedding over voiced windows.
pub struct SpectralProfiler {
    extractor: FeatureExtractor,
    embedding_sum: Vec<f64>,
    voiced_windows: usize,
}

impl SpectralProfiler {
    fn new() -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            embedding_sum: vec![0.0; N_MELS],
            voiced_windows: 0,
        }
    }

    fn percent(&self) -> f32 {
        self.voiced_windows.min(TARGET_VOICED_WINDOWS) as f32 / TARGET_VOICED_WINDOWS as f32
            * 100.0
    }
}

impl SpeakerProfiler for SpectralProfiler {
    fn min_enroll_samples(&self) -> usize {
        ENROLL_FRAME_SAMPLES
    }

    fn enroll(&mut self, frame: &[i16]) -> Result<EnrollUpdate, EngineError> {
        if frame.len() != ENROLL_FRAME_SAMPLES {
            return Err(EngineError::FrameLength {
                want: ENROLL_FRAME_SAMPLES,
                got: frame.len(),
            });
        }

        let clipped = frame.iter().filter(|&&s| s.unsigned_abs() >= 32_600).count();
        if clipped as f32 / frame.len() as f32 > MAX_CLIP_RATIO {
            return Ok(EnrollUpdate {
                percent: self.percent(),
                feedback: EnrollFeedback::QualityIssue,
            });
        }

        let windows = self.extractor.push(frame)?;
        let total = windows.len();
        let mut voiced = 0usize;
        for (mel, is_voiced) in windows {
            if !is_voiced {
                continue;
            }
            voiced += 1;
            for (acc, value) in self.embedding_sum.iter_mut().zip(mel.iter()) {
                *acc += *value as f64;
            }
        }
        self.voiced_windows += voiced;

        let feedback = if voiced == 0 {
            EnrollFeedback::UnrecognizableVoice
        } else if (voiced as f32) < total as f32 * 0.25 {
            EnrollFeedback::AudioTooShort
        } else {
            EnrollFeedback::AudioOk
        };

        Ok(EnrollUpdate {
            percent: self.percent(),
            feedback,
        })
    }

    fn export(&self) -> Result<SpeakerProfile, EngineError> {
        if self.voiced_windows < TARGET_VOICED_WINDOWS {
            return Err(EngineError::Export(format!(
                "enrollment incomplete ({:.1}%)",
                self.percent()
            )));
        }

        let mean: Vec<f32> = self
            .embedding_sum
            .iter()
            .map(|&sum| (sum / self.voiced_windows as f64) as f32)
            .collect();
        let payload = ProfilePayload {
            version: PROFILE_VERSION,
            sample_rate: SAMPLE_RATE,
            num_mels: N_MELS,
            embedding: normalize(&mean),
        };
        let bytes =
            serde_json::to_vec(&payload).map_err(|e| EngineError::Export(e.to_string()))?;
        Ok(SpeakerProfile::from_bytes(bytes))
    }
}

// ============================================================================
// Recognizer
// ============================================================================

/// Scores a rolling mean of recent voiced windows against each profile.
pub struct SpectralRecognizer {
    extractor: FeatureExtractor,
    profiles: Vec<Vec<f32>>,
    context: VecDeque<Vec<f32>>,
}

impl SpectralRecognizer {
    fn new(profiles: Vec<Vec<f32>>) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            profiles,
            context: VecDeque::with_capacity(CONTEXT_WINDOWS),
        }
    }
}

impl SpeakerRecognizer for SpectralRecognizer {
    fn frame_length(&self) -> usize {
        RECOGNIZE_FRAME_SAMPLES
    }

    fn process(&mut self, frame: &[i16]) -> Result<Vec<f32>, EngineError> {
        if frame.len() != RECOGNIZE_FRAME_SAMPLES {
            return Err(EngineError::FrameLength {
                want: RECOGNIZE_FRAME_SAMPLES,
                got: frame.len(),
            });
        }

        for (mel, voiced) in self.extractor.push(frame)? {
            if voiced {
                if self.context.len() == CONTEXT_WINDOWS {
                    self.context.pop_front();
                }
                self.context.push_back(mel);
            }
        }

        // Nothing voiced yet: every profile scores zero.
        if self.context.is_empty() {
            return Ok(vec![0.0; self.profiles.len()]);
        }

        let mut mean = vec![0.0f64; N_MELS];
        for window in &self.context {
            for (acc, value) in mean.iter_mut().zip(window.iter()) {
                *acc += *value as f64;
            }
        }
        let count = self.context.len() as f64;
        let mean: Vec<f32> = mean.iter().map(|&sum| (sum / count) as f32).collect();

        Ok(self
            .profiles
            .iter()
            .map(|profile| cosine_similarity(&mean, profile).max(0.0))
            .collect())
    }
}

// ============================================================================
// Feature Extraction
// ============================================================================

/// Streaming log-mel extractor over 25ms windows with a 10ms hop.
struct FeatureExtractor {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    filterbank: Vec<Vec<f32>>,
    /// Normalized samples awaiting a full analysis window.
    carry: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
}

impl FeatureExtractor {
    fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(N_FFT);
        let spectrum = fft.make_output_vec();

        // Symmetric Hann window
        let window: Vec<f32> = (0..WIN_LENGTH)
            .map(|i| {
                let n = (WIN_LENGTH - 1) as f32;
                0.5 * (1.0 - (2.0 * PI * i as f32 / n).cos())
            })
            .collect();

        Self {
            fft,
            window,
            filterbank: mel_filterbank(SAMPLE_RATE, N_FFT, N_MELS),
            carry: Vec::new(),
            spectrum,
        }
    }

    /// Feed raw samples; returns (log-mel vector, voiced) per completed
    /// analysis window. Leftover samples carry over to the next call.
    fn push(&mut self, frame: &[i16]) -> Result<Vec<(Vec<f32>, bool)>, EngineError> {
        self.carry
            .extend(frame.iter().map(|&s| s as f32 / 32_768.0));

        let mut out = Vec::new();
        while self.carry.len() >= WIN_LENGTH {
            let voiced = rms(&self.carry[..WIN_LENGTH]) >= VOICE_RMS;
            let mel = self.mel_energies()?;
            out.push((mel, voiced));
            self.carry.drain(..FRAME_SHIFT);
        }
        Ok(out)
    }

    /// Log-mel energies of the window at the front of the carry buffer.
    fn mel_energies(&mut self) -> Result<Vec<f32>, EngineError> {
        let mut input = vec![0.0f32; N_FFT];
        for (slot, (&sample, &weight)) in input
            .iter_mut()
            .zip(self.carry.iter().zip(self.window.iter()))
        {
            *slot = sample * weight;
        }

        self.fft
            .process(&mut input, &mut self.spectrum)
            .map_err(|e| EngineError::Process(e.to_string()))?;

        let mut mel = vec![0.0f32; N_MELS];
        for (m, filter) in self.filterbank.iter().enumerate() {
            let mut sum = 0.0f32;
            for (k, &weight) in filter.iter().enumerate() {
                sum += self.spectrum[k].norm_sqr() * weight;
            }
            // Log with floor to avoid log(0)
            mel[m] = sum.max(1e-10).ln();
        }
        Ok(mel)
    }
}

/// Triangular mel filterbank over FFT bins (HTK mel scale).
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let num_bins = n_fft / 2 + 1;
    let fmax = sample_rate as f32 / 2.0;

    let hz_to_mel = |hz: f32| -> f32 { 2595.0 * (1.0 + hz / 700.0).log10() };
    let mel_to_hz = |mel: f32| -> f32 { 700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0) };

    // Frequencies for each FFT bin
    let all_freqs: Vec<f32> = (0..num_bins)
        .map(|i| i as f32 * fmax / (num_bins - 1) as f32)
        .collect();

    // Mel points: left edge, centers, right edge
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(fmax);
    let f_pts: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(mel_min + i as f32 * (mel_max - mel_min) / (n_mels + 1) as f32))
        .collect();

    let f_diff: Vec<f32> = (0..n_mels + 1).map(|i| f_pts[i + 1] - f_pts[i]).collect();

    let mut filterbank = vec![vec![0.0f32; num_bins]; n_mels];
    for m in 0..n_mels {
        for (k, &freq) in all_freqs.iter().enumerate() {
            let lower = (freq - f_pts[m]) / f_diff[m];
            let upper = (f_pts[m + 2] - freq) / f_diff[m + 1];
            filterbank[m][k] = lower.min(upper).max(0.0);
        }
    }

    filterbank
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Cosine similarity between two vectors, from -1 to 1.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;

    for i in 0..a.len() {
        let a_val = a[i] as f64;
        let b_val = b[i] as f64;
        dot_product += a_val * b_val;
        norm_a += a_val * a_val;
        norm_b += b_val * b_val;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Normalize a vector to unit length.
fn normalize(v: &[f32]) -> Vec<f32> {
    let sum_sq: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum();
    if sum_sq < 1e-10 {
        return v.to_vec();
    }
    let norm = (1.0 / sum_sq.sqrt()) as f32;
    v.iter().map(|&x| x * norm).collect()
}
