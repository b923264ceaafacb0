//! Recognition session
//!
//! Loads every stored profile once, builds a recognizer over them, and
//! scores frames until one profile reaches the threshold. The store is
//! never re-read while listening; records enrolled after the session
//! started are picked up by the next one. An empty store reports
//! `NoSpeakers` without touching the device, and a profile the engine
//! cannot read ends the session before the device opens.

use crate::error::{Error, Result};
use crate::log::LogSink;
use crate::store::ProfileStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use voxid_audio::{AudioInput, AudioSource, DeviceError};
use voxid_engine::{EngineError, SpeakerProfile, SpeakerRecognizer, VoiceEngine};
use voxid_types::{LogEvent, SpeakerMatch};

/// Minimum score a profile must reach to be reported as a match.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// How a listening loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Matched(SpeakerMatch),
    NoMatch,
}

/// Pick the winner of one score row, if any.
///
/// A profile qualifies at or above `threshold`; among qualifiers the
/// strictly highest score wins, and a tie goes to the earlier record.
pub fn evaluate_scores(names: &[String], scores: &[f32], threshold: f32) -> Option<SpeakerMatch> {
    let mut best: Option<SpeakerMatch> = None;
    for (name, &score) in names.iter().zip(scores) {
        if score < threshold {
            continue;
        }
        match &best {
            Some(current) if score <= current.score => {}
            _ => {
                best = Some(SpeakerMatch {
                    name: name.clone(),
                    score,
                });
            }
        }
    }
    best
}

pub struct RecognitionSession {
    store: ProfileStore,
    engine: Arc<dyn VoiceEngine>,
    input: Arc<dyn AudioInput>,
    sink: LogSink,
    cancel: Arc<AtomicBool>,
    threshold: f32,
}

impl RecognitionSession {
    pub fn new(
        store: ProfileStore,
        engine: Arc<dyn VoiceEngine>,
        input: Arc<dyn AudioInput>,
        sink: LogSink,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            engine,
            input,
            sink,
            cancel,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Listen until a speaker matches, the input ends, or the session is
    /// cancelled. Returns the match, or `None` when nothing matched.
    pub fn run(&self) -> Result<Option<SpeakerMatch>> {
        let records = self.store.list_all()?;
        if records.is_empty() {
            tracing::info!("No speakers in the store, nothing to recognize against");
            self.sink.emit(LogEvent::NoSpeakers);
            return Ok(None);
        }

        let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
        let profiles: Vec<SpeakerProfile> = records
            .iter()
            .map(|r| SpeakerProfile::from_bytes(r.profile_data.clone()))
            .collect();
        let mut recognizer = self.engine.create_recognizer(&profiles).map_err(|e| match e {
            EngineError::InvalidProfile { index, message } => match records.get(index) {
                Some(record) => Error::Deserialization {
                    id: record.id,
                    name: record.name.clone(),
                    message,
                },
                None => Error::Engine(EngineError::InvalidProfile { index, message }),
            },
            other => Error::Engine(other),
        })?;
        tracing::debug!("Recognizing against {} profile(s)", names.len());

        let mut source = self.input.open(recognizer.frame_length())?;
        let outcome = self.listen(&names, &mut *recognizer, &mut *source);
        source.stop();

        match outcome? {
            RecognitionOutcome::Matched(m) => {
                tracing::info!("Recognized '{}' with score {:.2}", m.name, m.score);
                self.sink.emit(LogEvent::Recognized(m.clone()));
                Ok(Some(m))
            }
            RecognitionOutcome::NoMatch => {
                self.sink.emit(LogEvent::NoMatch);
                Ok(None)
            }
        }
    }

    /// Score frames until a match. The cancellation flag is checked once
    /// per frame, before the blocking read. A finite source that runs
    /// out of frames ends the session without a match.
    fn listen(
        &self,
        names: &[String],
        recognizer: &mut dyn SpeakerRecognizer,
        source: &mut dyn AudioSource,
    ) -> Result<RecognitionOutcome> {
        source.start()?;
        self.sink.emit(LogEvent::Listening);
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            let frame = match source.read() {
                Ok(frame) => frame,
                Err(DeviceError::EndOfStream) => return Ok(RecognitionOutcome::NoMatch),
                Err(e) => return Err(e.into()),
            };
            let scores = recognizer.process(&frame)?;
            match evaluate_scores(names, &scores, self.threshold) {
                Some(m) => return Ok(RecognitionOutcome::Matched(m)),
                None => self.sink.emit(LogEvent::BelowThreshold),
            }
        }
    }
}
