// Copyright 2026 SocialCheck Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress and verdict events.
//!
//! The pipeline pushes [`Event`]s onto an unbounded `tokio::sync::mpsc`
//! channel; a CLI, GUI, or log sink drains it at its own pace. Sending never
//! blocks and never drops: every verdict is eventually delivered as long as
//! the receiver is alive. When the receiver is gone, events are discarded
//! silently.

use crate::model::{Platform, Verdict};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Liveness,
    Extraction,
    Validation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Liveness => write!(f, "Liveness"),
            Self::Extraction => write!(f, "Extraction"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// An event emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    pub kind: EventKind,
}

/// The specific kind of event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// A stage started working on `total` items.
    StageStarted { stage: Stage, total: usize },
    /// One item of a stage finished. `index` is 1-based.
    Progress {
        stage: Stage,
        index: usize,
        total: usize,
        message: String,
    },
    /// A social link was discovered on a source domain.
    LinkFound {
        source: String,
        url: String,
        platform: Platform,
    },
    /// Terminal verdict for one link, in submission order.
    Verdict { verdict: Verdict },
    /// A stage finished.
    StageCompleted {
        stage: Stage,
        processed: usize,
        elapsed_ms: u64,
    },
    /// A non-fatal problem (unreachable page, failed scrape).
    Warning { message: String },
}

/// Cloneable handle for emitting events.
#[derive(Clone)]
pub struct EventEmitter {
    tx: Option<mpsc::UnboundedSender<Event>>,
    run_id: Arc<str>,
    seq: Arc<AtomicU64>,
}

impl EventEmitter {
    /// An emitter that discards everything.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            run_id: Arc::from(""),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit an event, ignoring a closed receiver.
    pub fn emit(&self, kind: EventKind) {
        if let Some(ref tx) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = tx.send(Event {
                run_id: self.run_id.to_string(),
                seq,
                kind,
            });
        }
    }

    pub fn progress(&self, stage: Stage, index: usize, total: usize, message: impl Into<String>) {
        self.emit(EventKind::Progress {
            stage,
            index,
            total,
            message: message.into(),
        });
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(EventKind::Warning {
            message: message.into(),
        });
    }
}

/// Create a new event channel for one run.
pub fn channel() -> (EventEmitter, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let emitter = EventEmitter {
        tx: Some(tx),
        run_id: Arc::from(uuid::Uuid::new_v4().to_string()),
        seq: Arc::new(AtomicU64::new(0)),
    };
    (emitter, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SocialLink, VerdictState};

    #[test]
    fn test_event_serialization() {
        let event = Event {
            run_id: "run-1".to_string(),
            seq: 1,
            kind: EventKind::Progress {
                stage: Stage::Liveness,
                index: 3,
                total: 5,
                message: "https://acme.org reachable".to_string(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"Progress""#));
        assert!(json.contains("Liveness"));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.seq, 1);
    }

    #[test]
    fn test_emit_sequence_numbers() {
        let (emitter, mut rx) = channel();
        emitter.warning("one");
        emitter.clone().warning("two");

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(first.run_id, second.run_id);
        assert!(!first.run_id.is_empty());
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (emitter, rx) = channel();
        drop(rx);
        // Should not panic
        emitter.emit(EventKind::Verdict {
            verdict: Verdict::new(
                SocialLink::new("acme.org", "https://x.com/acme", Platform::Twitter),
                VerdictState::Live,
                "no removal cues found",
                1,
            ),
        });
    }

    #[test]
    fn test_disabled_emitter_is_noop() {
        EventEmitter::disabled().progress(Stage::Validation, 1, 1, "done");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Extraction.to_string(), "Extraction");
    }
}
