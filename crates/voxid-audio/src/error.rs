//! Audio device errors

use thiserror::Error;

/// Errors raised while opening, driving, or draining an audio source.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no input device available")]
    NoDevice,

    #[error("input device index {0} out of range")]
    DeviceNotFound(usize),

    #[error("failed to enumerate input devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    Start(#[from] cpal::PlayStreamError),

    /// The running stream reported an error through its callback.
    #[error("audio stream failed: {0}")]
    Stream(String),

    #[error("audio source was read before start()")]
    NotStarted,

    /// File-backed sources report this once all frames are served.
    #[error("end of audio input")]
    EndOfStream,

    #[error("failed to read WAV data: {0}")]
    Wav(#[from] hound::Error),

    #[error("resampling failed: {0}")]
    Resample(String),
}
