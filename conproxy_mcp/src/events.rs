//! Structured Event Logger — NDJSON Event Recording
//!
//! Records every scheduler decision for offline analysis. Each line is a
//! single JSON object; the shape is tagged by `event_type`.
//!
//! # Log Format
//!
//! ```json
//! {"event_type":"inject","ts":"2026-08-01T10:30:00Z","interaction_number":4,"phase":"red","selected_constraint_ids":["tdd.red"],"reason":"scheduled"}
//! {"event_type":"pass","ts":"2026-08-01T10:30:01Z","interaction_number":5,"reason":"scheduled"}
//! {"event_type":"error","ts":"2026-08-01T10:30:02Z","interaction_number":6,"error_message":"deadline_exceeded"}
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One recorded decision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    Inject {
        ts: DateTime<Utc>,
        interaction_number: u32,
        phase: String,
        selected_constraint_ids: Vec<String>,
        reason: String,
    },
    Pass {
        ts: DateTime<Utc>,
        interaction_number: u32,
        reason: String,
    },
    Error {
        ts: DateTime<Utc>,
        interaction_number: u32,
        error_message: String,
    },
}

/// An opaque destination for NDJSON event lines. Implementors must not block
/// the dispatcher for more than a negligible amount of time.
pub trait EventSink: Send {
    fn write_line(&mut self, line: &str) -> std::io::Result<()>;
}

/// Writes each line to any `Write` implementation, unbuffered beyond a
/// single `writeln!` + flush — used for files and stdout alike.
pub struct WriterSink<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.inner, "{line}")?;
        self.inner.flush()
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl EventSink for MemorySink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Non-blocking NDJSON event logger. Emission hands the event to a bounded
/// channel drained by a dedicated writer thread; if the channel is full, the
/// event is dropped and `dropped_count` increments instead of blocking the
/// dispatcher.
pub struct EventLogger {
    sender: SyncSender<Event>,
    dropped: Arc<AtomicU64>,
    writer_thread: Option<JoinHandle<()>>,
}

const CHANNEL_CAPACITY: usize = 1024;

impl EventLogger {
    pub fn new(mut sink: Box<dyn EventSink>) -> Self {
        let (sender, receiver) = sync_channel::<Event>(CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicU64::new(0));

        let writer_thread = std::thread::spawn(move || {
            while let Ok(event) = receiver.recv() {
                if let Ok(line) = serde_json::to_string(&event) {
                    let _ = sink.write_line(&line);
                }
            }
        });

        Self {
            sender,
            dropped,
            writer_thread: Some(writer_thread),
        }
    }

    /// Emit an event, never blocking: a full channel drops the event.
    pub fn emit(&self, event: Event) {
        if self.sender.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if let Some(handle) = self.writer_thread.take() {
            drop(std::mem::replace(&mut self.sender, sync_channel(1).0));
            let _ = handle.join();
        }
    }
}
