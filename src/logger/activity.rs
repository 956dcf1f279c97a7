//! Browser-level activity events mapped onto JSONL entries.

#![allow(missing_docs)]

use std::time::Duration;

use crate::browser::fetcher::{FetchFailure, TermPageRequest};
use crate::browser::model::{BrowserState, IgnoredReason, Phase, SegmentFieldRef};
use crate::core::config::LoggingConfig;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Events emitted by the browser runtime.
#[derive(Debug, Clone)]
pub enum ActivityEvent<'a> {
    Mounted {
        target: &'a SegmentFieldRef,
    },
    FetchIssued {
        ticket: u64,
        request: &'a TermPageRequest,
    },
    PageApplied {
        ticket: u64,
        rows: usize,
        state: &'a BrowserState,
        elapsed: Duration,
    },
    FetchFailed {
        ticket: u64,
        phase: Phase,
        failure: &'a FetchFailure,
        elapsed: Duration,
    },
    EncodingRejected {
        ticket: u64,
        target: &'a str,
        failure: &'a FetchFailure,
    },
    TriggerIgnored {
        trigger: &'static str,
        reason: IgnoredReason,
    },
    StaleDiscarded {
        ticket: u64,
    },
    Unmounted {
        target: &'a SegmentFieldRef,
    },
}

/// Activity log sink owned by one browser runtime.
pub struct ActivityLog {
    writer: JsonlWriter,
}

impl ActivityLog {
    /// Open the log described by `config`; disabled configs discard.
    pub fn open(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            writer: JsonlWriter::open(JsonlConfig {
                path: config.jsonl_path.clone(),
                fallback_path: config.fallback_path.clone(),
                max_size_bytes: config.max_size_bytes,
                max_rotated_files: config.max_rotated_files,
            }),
        }
    }

    pub fn disabled() -> Self {
        Self {
            writer: JsonlWriter::disabled(),
        }
    }

    /// Writer degradation state ("normal", "fallback", "stderr", "discard").
    pub fn state(&self) -> &str {
        self.writer.state()
    }

    pub fn record(&mut self, event: &ActivityEvent<'_>) {
        self.writer.write_entry(&to_entry(event));
    }
}

fn to_entry(event: &ActivityEvent<'_>) -> LogEntry {
    match event {
        ActivityEvent::Mounted { target } => {
            let mut e = LogEntry::new(EventType::Mount, Severity::Info);
            e.segment = Some(target.segment_id);
            e.field = Some(target.field_name.clone());
            e
        }
        ActivityEvent::FetchIssued { ticket, request } => {
            let mut e = LogEntry::new(EventType::FetchIssued, Severity::Info);
            e.ticket = Some(*ticket);
            e.segment = Some(request.segment_id);
            e.field = Some(request.field_name.clone());
            e.encoding = Some(request.encoding.tag().to_owned());
            e.from.clone_from(&request.from);
            e.rows = Some(request.count);
            e
        }
        ActivityEvent::PageApplied {
            ticket,
            rows,
            state,
            elapsed,
        } => {
            let mut e = LogEntry::new(EventType::PageApplied, Severity::Info);
            e.ticket = Some(*ticket);
            e.segment = Some(state.segment_field.segment_id);
            e.field = Some(state.segment_field.field_name.clone());
            e.encoding = Some(state.encoding.tag().to_owned());
            e.rows = Some(*rows);
            e.total_rows = Some(state.terms.len());
            e.has_more = Some(state.has_more);
            e.duration_ms = Some(millis(*elapsed));
            e
        }
        ActivityEvent::FetchFailed {
            ticket,
            phase,
            failure,
            elapsed,
        } => {
            let mut e = LogEntry::new(EventType::FetchFailed, Severity::Warning);
            e.ticket = Some(*ticket);
            e.phase = Some(phase.label().to_owned());
            e.error_code = Some(failure.code());
            e.error_message = Some(failure.to_string());
            e.duration_ms = Some(millis(*elapsed));
            e
        }
        ActivityEvent::EncodingRejected {
            ticket,
            target,
            failure,
        } => {
            let mut e = LogEntry::new(EventType::EncodingRejected, Severity::Warning);
            e.ticket = Some(*ticket);
            e.encoding = Some((*target).to_owned());
            e.error_code = Some(failure.code());
            e.error_message = Some(failure.message());
            e
        }
        ActivityEvent::TriggerIgnored { trigger, reason } => {
            let mut e = LogEntry::new(EventType::TriggerIgnored, Severity::Info);
            e.details = Some((*trigger).to_owned());
            match reason {
                IgnoredReason::NotReady(phase) => e.phase = Some(phase.label().to_owned()),
                IgnoredReason::Exhausted => e.has_more = Some(false),
                IgnoredReason::StaleTicket(t) => e.ticket = Some(*t),
            }
            e
        }
        ActivityEvent::StaleDiscarded { ticket } => {
            let mut e = LogEntry::new(EventType::StaleDiscarded, Severity::Info);
            e.ticket = Some(*ticket);
            e
        }
        ActivityEvent::Unmounted { target } => {
            let mut e = LogEntry::new(EventType::Unmount, Severity::Info);
            e.segment = Some(target.segment_id);
            e.field = Some(target.field_name.clone());
            e
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
