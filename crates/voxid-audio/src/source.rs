//! Frame-oriented audio source traits

use crate::error::DeviceError;

/// A started audio source serving fixed-length frames of 16kHz mono i16.
pub trait AudioSource {
    /// Samples per frame returned by `read`.
    fn frame_length(&self) -> usize;

    /// Begin capturing. Must be called before the first `read`.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Block until one full frame is available and return it.
    ///
    /// File-backed sources return `DeviceError::EndOfStream` once the
    /// input is exhausted.
    fn read(&mut self) -> Result<Vec<i16>, DeviceError>;

    /// Release the device. Sessions call this exactly once per run,
    /// on every exit path.
    fn stop(&mut self);
}

/// Factory that opens an [`AudioSource`] on the calling thread.
///
/// cpal streams are not `Send`, so a session calls `open` from the worker
/// thread that will drive the source and never moves it afterwards.
pub trait AudioInput: Send + Sync {
    fn open(&self, frame_length: usize) -> Result<Box<dyn AudioSource>, DeviceError>;
}
