//! Opaque speaker profiles

/// An exported speaker profile.
///
/// The payload is meaningful only to the engine that exported it; the
/// rest of the system stores and forwards the bytes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerProfile {
    bytes: Vec<u8>,
}

impl SpeakerProfile {
    /// Wrap persisted bytes. No validation happens here; an engine that
    /// cannot read the payload rejects it at recognizer creation.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The exact bytes to persist.
    pub fn to_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
