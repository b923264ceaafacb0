//! Task orchestration
//!
//! One [`Orchestrator`] owns the shared store, engine, input factory,
//! and log sink. Each user intent runs on its own worker thread and
//! reports through the shared log channel; the returned [`TaskHandle`]
//! carries the cancellation flag and the join handle. Blocking device
//! reads happen entirely inside the workers.

use crate::enroll::EnrollmentSession;
use crate::error::{Error, Result};
use crate::log::LogSink;
use crate::recognize::{RecognitionSession, DEFAULT_THRESHOLD};
use crate::store::ProfileStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use voxid_audio::AudioInput;
use voxid_engine::VoiceEngine;
use voxid_types::{LogEvent, TaskKind};

/// A running worker.
///
/// Dropping the handle detaches the worker; it keeps running and keeps
/// reporting through the log channel.
#[derive(Debug)]
pub struct TaskHandle {
    kind: TaskKind,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Ask the worker to stop at its next per-frame check.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// The worker's cancellation flag. Setting it has the same effect
    /// as [`TaskHandle::cancel`]; a clone can live in a signal handler.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Wait for the worker to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                tracing::error!("Worker for task '{}' panicked", self.kind);
            }
        }
    }
}

pub struct Orchestrator {
    store: ProfileStore,
    engine: Arc<dyn VoiceEngine>,
    input: Arc<dyn AudioInput>,
    sink: LogSink,
    threshold: f32,
}

impl Orchestrator {
    pub fn new(
        store: ProfileStore,
        engine: Arc<dyn VoiceEngine>,
        input: Arc<dyn AudioInput>,
        sink: LogSink,
    ) -> Self {
        Self {
            store,
            engine,
            input,
            sink,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Recognition threshold for workers started after this call.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Start an enrollment worker.
    ///
    /// An empty or all-whitespace name is rejected here, before any
    /// thread is spawned or device touched; the stored name is trimmed.
    pub fn enroll(&self, name: &str) -> Result<TaskHandle> {
        let name = validated_name(name)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let session = EnrollmentSession::new(
            self.store.clone(),
            Arc::clone(&self.engine),
            Arc::clone(&self.input),
            self.sink.clone(),
            Arc::clone(&cancel),
        );
        let sink = self.sink.clone();
        let join_handle = thread::spawn(move || {
            if let Err(e) = session.run(&name) {
                report_failure(&sink, TaskKind::Enroll, e);
            }
        });
        Ok(TaskHandle {
            kind: TaskKind::Enroll,
            cancel,
            join_handle: Some(join_handle),
        })
    }

    /// Start a recognition worker.
    pub fn recognize(&self) -> TaskHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let session = RecognitionSession::new(
            self.store.clone(),
            Arc::clone(&self.engine),
            Arc::clone(&self.input),
            self.sink.clone(),
            Arc::clone(&cancel),
        )
        .with_threshold(self.threshold);
        let sink = self.sink.clone();
        let join_handle = thread::spawn(move || {
            if let Err(e) = session.run() {
                report_failure(&sink, TaskKind::Recognize, e);
            }
        });
        TaskHandle {
            kind: TaskKind::Recognize,
            cancel,
            join_handle: Some(join_handle),
        }
    }

    /// Start a worker that streams the stored speakers as events.
    pub fn list(&self) -> TaskHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let store = self.store.clone();
        let sink = self.sink.clone();
        let join_handle = thread::spawn(move || match store.list_summaries() {
            Ok(summaries) => {
                if summaries.is_empty() {
                    sink.emit(LogEvent::NoSpeakers);
                    return;
                }
                let count = summaries.len();
                for summary in summaries {
                    sink.emit(LogEvent::SpeakerListed {
                        name: summary.name,
                        created_at: summary.created_at,
                    });
                }
                sink.emit(LogEvent::ListFinished { count });
            }
            Err(e) => report_failure(&sink, TaskKind::List, e),
        });
        TaskHandle {
            kind: TaskKind::List,
            cancel,
            join_handle: Some(join_handle),
        }
    }

    /// Start a worker that deletes every record with this name. The name
    /// is validated like [`Orchestrator::enroll`].
    pub fn delete(&self, name: &str) -> Result<TaskHandle> {
        let name = validated_name(name)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let store = self.store.clone();
        let sink = self.sink.clone();
        let join_handle = thread::spawn(move || match store.delete_by_name(&name) {
            Ok(removed) => sink.emit(LogEvent::Deleted { name, removed }),
            Err(e) => report_failure(&sink, TaskKind::Delete, e),
        });
        Ok(TaskHandle {
            kind: TaskKind::Delete,
            cancel,
            join_handle: Some(join_handle),
        })
    }
}

fn validated_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "speaker name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Translate a worker's terminal error into its final event.
fn report_failure(sink: &LogSink, task: TaskKind, error: Error) {
    match error {
        Error::Cancelled => sink.emit(LogEvent::Cancelled { task }),
        other => {
            tracing::error!("Task '{}' failed: {}", task, other);
            sink.emit(LogEvent::TaskFailed {
                task,
                message: other.to_string(),
            });
        }
    }
}
