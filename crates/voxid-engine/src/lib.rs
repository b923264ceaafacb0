//! Speaker engine crate for voxid
//!
//! Defines the opaque engine contract the sessions are written against:
//! a [`SpeakerProfiler`] builds one profile incrementally from enrollment
//! frames, a [`SpeakerRecognizer`] scores live frames against a fixed set
//! of profiles, and a [`VoiceEngine`] constructs both from one credential.
//!
//! The [`spectral`] module is the builtin engine: log-mel embeddings with
//! cosine scoring. It makes the system run end to end without a vendor
//! SDK; its scores are deterministic but not tuned for biometric use.

pub mod error;
pub mod profile;
pub mod spectral;
pub mod traits;

pub use error::EngineError;
pub use profile::SpeakerProfile;
pub use spectral::SpectralEngine;
pub use traits::{SpeakerProfiler, SpeakerRecognizer, VoiceEngine};
