//! Audio input crate for voxid
//!
//! Provides the frame-oriented capture abstraction the sessions run on:
//! - **Microphone capture** via cpal (cross-platform), resampled to 16kHz
//! - **WAV file input** via hound, served frame by frame
//! - **Device enumeration** for the CLI `devices` command
//!
//! Sources block on `read()` until a full frame of i16 samples at 16kHz
//! is available; sessions own their source and release it with `stop()`.

pub mod error;
pub mod mic;
pub mod resampling;
pub mod source;
pub mod wav;

pub use error::DeviceError;
pub use mic::{list_input_devices, MicInput};
pub use source::{AudioInput, AudioSource};
pub use wav::WavInput;

/// Sample rate every source delivers, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;
