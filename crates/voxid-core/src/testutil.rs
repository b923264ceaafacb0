//! Test doubles shared by the session and orchestrator tests.
//!
//! `ScriptedInput` stands in for an audio device: its sources serve
//! silent frames, fail on scripted call indices, and count every open,
//! read, and stop through a shared handle so tests can assert device
//! lifecycle after a session ran. `MockEngine` produces profilers and
//! recognizers with fixed per-call outputs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use voxid_audio::{AudioInput, AudioSource, DeviceError};
use voxid_engine::{
    EngineError, SpeakerProfile, SpeakerProfiler, SpeakerRecognizer, VoiceEngine,
};
use voxid_types::{EnrollFeedback, EnrollUpdate};

pub const MOCK_FRAME_SAMPLES: usize = 160;
pub const MOCK_PROFILE_BYTES: &[u8] = b"mock-profile";

// ============================================================================
// Scripted audio input
// ============================================================================

/// Call counters shared between a [`ScriptedInput`] and its sources.
#[derive(Default)]
pub struct IoCounters {
    opened: AtomicUsize,
    reads: AtomicUsize,
    stops: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct ScriptedInput {
    pub(crate) counters: Arc<IoCounters>,
    /// `open` itself fails; no source is created.
    pub fail_open: bool,
    /// `start` fails after a successful open.
    pub fail_start: bool,
    /// Zero-based read index that fails with a stream error.
    pub fail_read_at: Option<usize>,
    /// Number of successful reads before `EndOfStream`.
    pub end_after: Option<usize>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `open` was called.
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// How many times `read` was called, successful or not.
    pub fn reads(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// How many times `stop` was called.
    pub fn stops(&self) -> usize {
        self.counters.stops.load(Ordering::SeqCst)
    }
}

impl AudioInput for ScriptedInput {
    fn open(&self, frame_length: usize) -> Result<Box<dyn AudioSource>, DeviceError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(DeviceError::NoDevice);
        }
        Ok(Box::new(ScriptedSource {
            counters: Arc::clone(&self.counters),
            fail_start: self.fail_start,
            fail_read_at: self.fail_read_at,
            end_after: self.end_after,
            frame_length,
        }))
    }
}

struct ScriptedSource {
    counters: Arc<IoCounters>,
    fail_start: bool,
    fail_read_at: Option<usize>,
    end_after: Option<usize>,
    frame_length: usize,
}

impl AudioSource for ScriptedSource {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.fail_start {
            return Err(DeviceError::Stream("scripted start failure".to_string()));
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<i16>, DeviceError> {
        let index = self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_read_at == Some(index) {
            return Err(DeviceError::Stream("scripted read failure".to_string()));
        }
        if let Some(limit) = self.end_after {
            if index >= limit {
                return Err(DeviceError::EndOfStream);
            }
        }
        Ok(vec![0i16; self.frame_length])
    }

    fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock voice engine
// ============================================================================

/// A [`VoiceEngine`] with scripted profiler and recognizer behaviour.
#[derive(Default)]
pub struct MockEngine {
    /// Progress per successive `enroll` call; the last entry repeats.
    pub profiler_percents: Vec<f32>,
    /// Zero-based enroll call index that fails.
    pub enroll_error_at: Option<usize>,
    pub fail_create_profiler: bool,
    pub fail_export: bool,
    /// Profile index `create_recognizer` rejects as unreadable.
    pub invalid_profile_at: Option<usize>,
    /// Score row per successive `process` call; the last row repeats.
    pub score_rows: Vec<Vec<f32>>,
    /// Zero-based process call index that fails.
    pub process_error_at: Option<usize>,
    pub(crate) recognizers_created: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn enrolling(percents: &[f32]) -> Self {
        Self {
            profiler_percents: percents.to_vec(),
            ..Self::default()
        }
    }

    pub fn scoring(rows: &[&[f32]]) -> Self {
        Self {
            score_rows: rows.iter().map(|row| row.to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn recognizers_created(&self) -> usize {
        self.recognizers_created.load(Ordering::SeqCst)
    }
}

impl VoiceEngine for MockEngine {
    fn create_profiler(&self) -> Result<Box<dyn SpeakerProfiler>, EngineError> {
        if self.fail_create_profiler {
            return Err(EngineError::Create("scripted profiler failure".to_string()));
        }
        Ok(Box::new(MockProfiler {
            percents: self.profiler_percents.clone(),
            enroll_error_at: self.enroll_error_at,
            fail_export: self.fail_export,
            calls: 0,
        }))
    }

    fn create_recognizer(
        &self,
        profiles: &[SpeakerProfile],
    ) -> Result<Box<dyn SpeakerRecognizer>, EngineError> {
        if let Some(index) = self.invalid_profile_at {
            if index < profiles.len() {
                return Err(EngineError::InvalidProfile {
                    index,
                    message: "scripted unreadable profile".to_string(),
                });
            }
        }
        self.recognizers_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockRecognizer {
            rows: self.score_rows.clone(),
            process_error_at: self.process_error_at,
            profiles: profiles.len(),
            calls: 0,
        }))
    }
}

struct MockProfiler {
    percents: Vec<f32>,
    enroll_error_at: Option<usize>,
    fail_export: bool,
    calls: usize,
}

impl SpeakerProfiler for MockProfiler {
    fn min_enroll_samples(&self) -> usize {
        MOCK_FRAME_SAMPLES
    }

    fn enroll(&mut self, _frame: &[i16]) -> Result<EnrollUpdate, EngineError> {
        let index = self.calls;
        self.calls += 1;
        if self.enroll_error_at == Some(index) {
            return Err(EngineError::Enroll("scripted enroll failure".to_string()));
        }
        let percent = self
            .percents
            .get(index)
            .or_else(|| self.percents.last())
            .copied()
            .unwrap_or(0.0);
        Ok(EnrollUpdate {
            percent,
            feedback: EnrollFeedback::AudioOk,
        })
    }

    fn export(&self) -> Result<SpeakerProfile, EngineError> {
        if self.fail_export {
            return Err(EngineError::Export("scripted export failure".to_string()));
        }
        Ok(SpeakerProfile::from_bytes(MOCK_PROFILE_BYTES.to_vec()))
    }
}

struct MockRecognizer {
    rows: Vec<Vec<f32>>,
    process_error_at: Option<usize>,
    profiles: usize,
    calls: usize,
}

impl SpeakerRecognizer for MockRecognizer {
    fn frame_length(&self) -> usize {
        MOCK_FRAME_SAMPLES
    }

    fn process(&mut self, _frame: &[i16]) -> Result<Vec<f32>, EngineError> {
        let index = self.calls;
        self.calls += 1;
        if self.process_error_at == Some(index) {
            return Err(EngineError::Process("scripted process failure".to_string()));
        }
        Ok(self
            .rows
            .get(index)
            .or_else(|| self.rows.last())
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.profiles]))
    }
}
