//! Engine errors

use thiserror::Error;

/// Errors raised by speaker engines.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine rejected the credential")]
    InvalidCredential,

    #[error("failed to create engine: {0}")]
    Create(String),

    #[error("enrollment failed: {0}")]
    Enroll(String),

    #[error("profile export failed: {0}")]
    Export(String),

    #[error("frame scoring failed: {0}")]
    Process(String),

    #[error("frame has {got} samples, engine requires {want}")]
    FrameLength { want: usize, got: usize },

    /// `index` is the position of the offending profile in the slice the
    /// recognizer was created with.
    #[error("profile {index} is not readable by this engine: {message}")]
    InvalidProfile { index: usize, message: String },
}
