//! Core error taxonomy
//!
//! Every error is terminal for the task that raised it: nothing retries,
//! the task reports one failure event and ends.

use thiserror::Error;
use voxid_audio::DeviceError;
use voxid_engine::EngineError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("audio device error: {0}")]
    Device(#[from] DeviceError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    /// A persisted profile could not be read back by the engine.
    #[error("stored profile for '{name}' (record {id}) is unreadable: {message}")]
    Deserialization {
        id: i64,
        name: String,
        message: String,
    },

    #[error("invalid input: {0}")]
    Validation(String),

    /// The task observed its cancellation flag and stopped early.
    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
