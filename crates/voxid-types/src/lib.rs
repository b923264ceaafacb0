//! Shared types for voxid
//!
//! This crate contains the data structures passed between the audio,
//! engine, core, and CLI crates, plus the user-facing event stream.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Speaker Records
// ============================================================================

/// A persisted speaker profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerRecord {
    /// Auto-assigned record ID
    pub id: i64,
    /// Speaker name (duplicates allowed; `id` is the identity)
    pub name: String,
    /// Opaque exported profile bytes
    #[serde(skip)]
    pub profile_data: Vec<u8>,
    /// Insertion timestamp, RFC 3339
    pub created_at: String,
}

/// Speaker record without the profile blob (for listings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSummary {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A recognized speaker with its winning score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerMatch {
    pub name: String,
    pub score: f32,
}

// ============================================================================
// Enrollment Types
// ============================================================================

/// Per-frame feedback from the profiler during enrollment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollFeedback {
    /// Frame accepted and contributed to the profile
    AudioOk,
    /// Frame shorter than the engine can use
    AudioTooShort,
    /// No usable voice found in the frame
    UnrecognizableVoice,
    /// Voice present but too noisy or clipped to use
    QualityIssue,
}

impl fmt::Display for EnrollFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EnrollFeedback::AudioOk => "Good audio",
            EnrollFeedback::AudioTooShort => "Audio too short",
            EnrollFeedback::UnrecognizableVoice => "No voice detected",
            EnrollFeedback::QualityIssue => "Poor audio quality",
        };
        write!(f, "{}", text)
    }
}

/// One enrollment step: cumulative progress plus frame feedback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollUpdate {
    /// Cumulative progress in percent, clamped to 100.0
    pub percent: f32,
    pub feedback: EnrollFeedback,
}

// ============================================================================
// Audio Types
// ============================================================================

/// Audio input device information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDevice {
    /// Position in the capture-device enumeration
    pub index: usize,
    /// Human-readable device name
    pub name: String,
    /// Whether this is the default device
    pub is_default: bool,
}

// ============================================================================
// Task & Event Types
// ============================================================================

/// The operations the orchestrator can run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Enroll,
    Recognize,
    List,
    Delete,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TaskKind::Enroll => "enroll",
            TaskKind::Recognize => "recognize",
            TaskKind::List => "list",
            TaskKind::Delete => "delete",
        };
        write!(f, "{}", text)
    }
}

/// User-visible event emitted by workers into the ordered log channel.
///
/// The `Display` impl is the exact line shown to the user; the serde form
/// exists for structured consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// Enrollment progress after one frame
    EnrollProgress { percent: f32, feedback: EnrollFeedback },
    /// Profile exported and persisted
    EnrollCompleted { name: String, id: i64 },
    /// Recognition session is reading frames
    Listening,
    /// A profile scored at or above the threshold
    Recognized(SpeakerMatch),
    /// No profile reached the threshold on this frame
    BelowThreshold,
    /// Recognition ended without any profile reaching the threshold
    NoMatch,
    /// The store holds no profiles
    NoSpeakers,
    /// One record in a listing
    SpeakerListed { name: String, created_at: String },
    /// Listing finished
    ListFinished { count: usize },
    /// Delete finished; `removed` may be 0
    Deleted { name: String, removed: usize },
    /// Task observed its cancellation flag and stopped
    Cancelled { task: TaskKind },
    /// Task ended with a terminal error
    TaskFailed { task: TaskKind, message: String },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::EnrollProgress { percent, feedback } => {
                write!(f, "Enrollment progress: {:.2}% - {}", percent, feedback)
            }
            LogEvent::EnrollCompleted { name, id } => {
                write!(f, "Enrolled speaker '{}' (record #{})", name, id)
            }
            LogEvent::Listening => write!(f, "Listening..."),
            LogEvent::Recognized(m) => {
                write!(f, "Recognized speaker: {} (score: {:.2})", m.name, m.score)
            }
            LogEvent::BelowThreshold => write!(f, "No matches above threshold"),
            LogEvent::NoMatch => write!(f, "No speaker matched"),
            LogEvent::NoSpeakers => write!(f, "No speakers enrolled"),
            LogEvent::SpeakerListed { name, created_at } => {
                write!(f, "  {} (enrolled {})", name, created_at)
            }
            LogEvent::ListFinished { count } => {
                write!(f, "{} speaker(s) enrolled", count)
            }
            LogEvent::Deleted { name, removed } => {
                write!(f, "Deleted {} record(s) for '{}'", removed, name)
            }
            LogEvent::Cancelled { task } => write!(f, "Task '{}' cancelled", task),
            LogEvent::TaskFailed { task, message } => {
                write!(f, "Task '{}' failed: {}", task, message)
            }
        }
    }
}
