//! Core sessions and storage for voxid
//!
//! Ties the engine and audio abstractions together: the durable profile
//! store, the enrollment and recognition sessions, and the orchestrator
//! that runs each user intent on its own worker thread while funneling
//! every user-visible event through one ordered log channel.

pub mod enroll;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod recognize;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use enroll::EnrollmentSession;
pub use error::{Error, Result};
pub use log::{log_channel, LogSink};
pub use orchestrator::{Orchestrator, TaskHandle};
pub use recognize::{evaluate_scores, RecognitionOutcome, RecognitionSession, DEFAULT_THRESHOLD};
pub use store::ProfileStore;
