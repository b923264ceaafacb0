//! Enrollment session
//!
//! Drives an engine profiler to 100% with frames from an audio source,
//! then exports the profile and persists it. The profiler is created
//! before the device is opened, so a profiler that fails to create
//! never touches the device. The source is released exactly once on
//! every exit path, and nothing is persisted unless export succeeded.

use crate::error::{Error, Result};
use crate::log::LogSink;
use crate::store::ProfileStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use voxid_audio::{AudioInput, AudioSource};
use voxid_engine::{SpeakerProfiler, VoiceEngine};
use voxid_types::LogEvent;

pub struct EnrollmentSession {
    store: ProfileStore,
    engine: Arc<dyn VoiceEngine>,
    input: Arc<dyn AudioInput>,
    sink: LogSink,
    cancel: Arc<AtomicBool>,
}

impl EnrollmentSession {
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
        }
    }

    /// Run one enrollment to completion and return the new record id.
    pub fn run(&self, name: &str) -> Result<i64> {
        let mut profiler = self.engine.create_profiler()?;
        let mut source = self.input.open(profiler.min_enroll_samples())?;
        tracing::debug!(
            "Enrolling '{}' in frames of {} samples",
            name,
            source.frame_length()
        );

        let outcome = self.capture(&mut *profiler, &mut *source);
        source.stop();
        outcome?;

        let profile = profiler.export()?;
        let id = self.store.insert(name, profile.to_bytes())?;
        tracing::info!("Enrollment for '{}' complete (record {})", name, id);
        self.sink.emit(LogEvent::EnrollCompleted {
            name: name.to_string(),
            id,
        });
        Ok(id)
    }

    /// Feed frames until the profiler reports 100%. The cancellation
    /// flag is checked once per frame, before the blocking read.
    fn capture(
        &self,
        profiler: &mut dyn SpeakerProfiler,
        source: &mut dyn AudioSource,
    ) -> Result<()> {
        source.start()?;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            let frame = source.read()?;
            let update = profiler.enroll(&frame)?;
            self.sink.emit(LogEvent::EnrollProgress {
                percent: update.percent,
                feedback: update.feedback,
            });
            if update.percent >= 100.0 {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::log_channel;
    use crate::testutil::{MockEngine, ScriptedInput, MOCK_PROFILE_BYTES};
    use std::sync::mpsc::Receiver;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: ProfileStore,
        input: ScriptedInput,
        session: EnrollmentSession,
        rx: Receiver<LogEvent>,
        cancel: Arc<AtomicBool>,
    }

    fn fixture(engine: MockEngine, input: ScriptedInput) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("speakers.db"));
        store.initialize().unwrap();
        let (sink, rx) = log_channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let session = EnrollmentSession::new(
            store.clone(),
            Arc::new(engine),
            Arc::new(input.clone()),
            sink,
            Arc::clone(&cancel),
        );
        Fixture {
            _dir: dir,
            store,
            input,
            session,
            rx,
            cancel,
        }
    }

    fn progress_percents(events: &[LogEvent]) -> Vec<f32> {
        events
            .iter()
            .filter_map(|e| match e {
                LogEvent::EnrollProgress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn successful_enrollment_persists_one_profile() {
        let engine = MockEngine::enrolling(&[25.0, 50.0, 75.0, 100.0]);
        let f = fixture(engine, ScriptedInput::new());

        let id = f.session.run("alice").unwrap();

        let events: Vec<LogEvent> = f.rx.try_iter().collect();
        assert_eq!(progress_percents(&events), vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(
            events.last(),
            Some(&LogEvent::EnrollCompleted {
                name: "alice".to_string(),
                id,
            })
        );

        let records = f.store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "alice");
        assert_eq!(records[0].profile_data, MOCK_PROFILE_BYTES);

        assert_eq!(f.input.opened(), 1);
        assert_eq!(f.input.reads(), 4);
        assert_eq!(f.input.stops(), 1);
    }

    #[test]
    fn profiler_failure_never_touches_the_device() {
        let engine = MockEngine {
            fail_create_profiler: true,
            ..MockEngine::default()
        };
        let f = fixture(engine, ScriptedInput::new());

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        assert_eq!(f.input.opened(), 0);
        assert_eq!(f.input.stops(), 0);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn start_failure_still_releases_the_source() {
        let input = ScriptedInput {
            fail_start: true,
            ..ScriptedInput::new()
        };
        let f = fixture(MockEngine::enrolling(&[100.0]), input);

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Device(_)));

        assert_eq!(f.input.reads(), 0);
        assert_eq!(f.input.stops(), 1);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn read_failure_mid_enrollment_is_terminal() {
        let input = ScriptedInput {
            fail_read_at: Some(1),
            ..ScriptedInput::new()
        };
        let f = fixture(MockEngine::enrolling(&[25.0, 50.0, 75.0, 100.0]), input);

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Device(_)));

        let events: Vec<LogEvent> = f.rx.try_iter().collect();
        assert_eq!(progress_percents(&events), vec![25.0]);
        assert_eq!(f.input.stops(), 1);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn enroll_error_is_terminal_and_nothing_is_persisted() {
        let engine = MockEngine {
            enroll_error_at: Some(1),
            ..MockEngine::enrolling(&[25.0, 50.0])
        };
        let f = fixture(engine, ScriptedInput::new());

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        let events: Vec<LogEvent> = f.rx.try_iter().collect();
        assert_eq!(progress_percents(&events), vec![25.0]);
        assert_eq!(f.input.stops(), 1);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn read_failure_on_the_final_frame_still_releases_the_source() {
        let input = ScriptedInput {
            fail_read_at: Some(3),
            ..ScriptedInput::new()
        };
        let f = fixture(MockEngine::enrolling(&[25.0, 50.0, 75.0, 100.0]), input);

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Device(_)));

        let events: Vec<LogEvent> = f.rx.try_iter().collect();
        assert_eq!(progress_percents(&events), vec![25.0, 50.0, 75.0]);
        assert_eq!(f.input.reads(), 4);
        assert_eq!(f.input.stops(), 1);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn enroll_error_on_the_final_frame_persists_nothing() {
        let engine = MockEngine {
            enroll_error_at: Some(3),
            ..MockEngine::enrolling(&[25.0, 50.0, 75.0, 100.0])
        };
        let f = fixture(engine, ScriptedInput::new());

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        let events: Vec<LogEvent> = f.rx.try_iter().collect();
        assert_eq!(progress_percents(&events), vec![25.0, 50.0, 75.0]);
        assert_eq!(f.input.reads(), 4);
        assert_eq!(f.input.stops(), 1);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn export_failure_persists_nothing() {
        let engine = MockEngine {
            fail_export: true,
            ..MockEngine::enrolling(&[100.0])
        };
        let f = fixture(engine, ScriptedInput::new());

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        let events: Vec<LogEvent> = f.rx.try_iter().collect();
        assert!(events
            .iter()
            .all(|e| !matches!(e, LogEvent::EnrollCompleted { .. })));
        assert_eq!(f.input.stops(), 1);
        assert!(f.store.list_all().unwrap().is_empty());
    }

    #[test]
    fn cancellation_is_observed_before_the_first_read() {
        let f = fixture(MockEngine::enrolling(&[100.0]), ScriptedInput::new());
        f.cancel.store(true, Ordering::SeqCst);

        let err = f.session.run("alice").unwrap_err();
        assert!(matches!(err, Error::Cancelled));

        assert_eq!(f.input.reads(), 0);
        assert_eq!(f.input.stops(), 1);
        assert!(f.rx.try_iter().next().is_none());
        assert!(f.store.list_all().unwrap().is_empty());
    }
}
