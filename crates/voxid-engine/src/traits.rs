//! Speaker engine traits

use crate::error::EngineError;
use crate::profile::SpeakerProfile;
use voxid_types::EnrollUpdate;

/// Incremental builder of one speaker profile.
pub trait SpeakerProfiler {
    /// Samples per enrollment frame.
    fn min_enroll_samples(&self) -> usize;

    /// Feed one frame of 16kHz mono i16 audio.
    ///
    /// Returns cumulative progress plus feedback for this frame. Progress
    /// never decreases and finishes at exactly 100.0.
    fn enroll(&mut self, frame: &[i16]) -> Result<EnrollUpdate, EngineError>;

    /// Export the completed profile.
    fn export(&self) -> Result<SpeakerProfile, EngineError>;
}

/// Scores frames against the profiles the recognizer was created with.
pub trait SpeakerRecognizer {
    /// Samples per recognition frame.
    fn frame_length(&self) -> usize;

    /// Score one frame; `scores[i]` belongs to profile `i` of the slice
    /// passed at creation.
    fn process(&mut self, frame: &[i16]) -> Result<Vec<f32>, EngineError>;
}

/// Factory for profilers and recognizers sharing one credential.
pub trait VoiceEngine: Send + Sync {
    fn create_profiler(&self) -> Result<Box<dyn SpeakerProfiler>, EngineError>;

    fn create_recognizer(
        &self,
        profiles: &[SpeakerProfile],
    ) -> Result<Box<dyn SpeakerRecognizer>, EngineError>;
}
