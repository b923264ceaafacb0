//! Ordered event log channel
//!
//! The single shared resource between workers: every task sends its
//! user-visible events into one mpsc channel, and exactly one consumer
//! drains them in send order.

use std::sync::mpsc::{self, Receiver, Sender};
use voxid_types::LogEvent;

/// Sending half of the event log. Clones freely; events from all tasks
/// interleave in the order they were sent.
#[derive(Clone)]
pub struct LogSink {
    tx: Sender<LogEvent>,
}

impl LogSink {
    /// Record one event. After the consumer hangs up, events are
    /// silently discarded.
    pub fn emit(&self, event: LogEvent) {
        tracing::debug!("log event: {}", event);
        let _ = self.tx.send(event);
    }
}

/// Create the log channel: one cloneable sink, one consumer.
pub fn log_channel() -> (LogSink, Receiver<LogEvent>) {
    let (tx, rx) = mpsc::channel();
    (LogSink { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_send_order() {
        let (sink, rx) = log_channel();
        sink.emit(LogEvent::Listening);
        sink.emit(LogEvent::NoSpeakers);
        drop(sink);

        let events: Vec<LogEvent> = rx.iter().collect();
        assert_eq!(events, vec![LogEvent::Listening, LogEvent::NoSpeakers]);
    }

    #[test]
    fn emit_after_consumer_drop_is_harmless() {
        let (sink, rx) = log_channel();
        drop(rx);
        sink.emit(LogEvent::Listening);
    }
}
