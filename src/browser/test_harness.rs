//! Scripted backends and a headless driver for browser tests.
//!
//! [`ScriptedSource`] answers term page requests from a route table keyed by
//! segment, field, encoding and `from`, mirroring the fixtures the backend
//! tests use. [`GateSource`] blocks every fetch until opened so tests can
//! interleave triggers with an in-flight request.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use super::encoding::Encoding;
use super::fetcher::{FetchFailure, TermPageRequest, TermSource};
use super::model::{BrowserCmd, BrowserModel, BrowserMsg, SegmentFieldRef, TermListing, TermRecord};
use super::render;
use super::runtime::Notifier;
use super::update;

// ──────────────────── fixtures ────────────────────

pub fn record(term: &str) -> TermRecord {
    TermRecord {
        term: term.to_owned(),
        doc_freq: 1,
        total_term_freq: 1,
    }
}

pub fn listing_of(terms: &[String], doc_count: i64, min: &str, max: &str) -> TermListing {
    TermListing {
        term_count: 101,
        doc_count,
        min_term: min.to_owned(),
        max_term: max.to_owned(),
        terms: terms.iter().map(|t| record(t)).collect(),
    }
}

/// Three-term dictionary: `aardvark`, `bat`, `cat`.
pub fn small_listing() -> TermListing {
    let terms: Vec<String> = ["aardvark", "bat", "cat"].map(str::to_owned).to_vec();
    listing_of(&terms, 19, "aardvark", "zebra")
}

/// `aa..ej` followed by the lookahead row `fa`: 51 rows.
pub fn full_page_listing() -> TermListing {
    let mut terms = two_letter_terms(50);
    terms.push("fa".to_owned());
    listing_of(&terms, 55, "aa", "fe")
}

/// The tail served for `from=fa`.
pub fn tail_listing() -> TermListing {
    let terms: Vec<String> = ["fa", "fb", "fc", "fd", "fe"].map(str::to_owned).to_vec();
    listing_of(&terms, 55, "aa", "fe")
}

/// `aa, ab, .. aj, ba, ..` up to `count` terms.
pub fn two_letter_terms(count: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(count);
    for first in b'a'..=b'z' {
        for second in b'a'..=b'j' {
            if out.len() == count {
                return out;
            }
            out.push(format!("{}{}", first as char, second as char));
        }
    }
    out
}

pub fn encoding_rejection(field: &str, encoding: Encoding) -> FetchFailure {
    FetchFailure::Rejected {
        status: 400,
        code: 400,
        message: format!("Field {field} cannot be decoded as {}", encoding.tag()),
    }
}

// ──────────────────── scripted source ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    segment_id: u32,
    field_name: String,
    encoding: Encoding,
    from: Option<String>,
}

/// Route-table backend. Unmatched requests get a 404 rejection.
#[derive(Default)]
pub struct ScriptedSource {
    routes: Vec<(Route, Result<TermListing, FetchFailure>)>,
    seen: Mutex<Vec<TermPageRequest>>,
}

impl ScriptedSource {
    #[must_use]
    pub fn route(
        mut self,
        target: &SegmentFieldRef,
        encoding: Encoding,
        from: Option<&str>,
        result: Result<TermListing, FetchFailure>,
    ) -> Self {
        self.routes.push((
            Route {
                segment_id: target.segment_id,
                field_name: target.field_name.clone(),
                encoding,
                from: from.map(str::to_owned),
            },
            result,
        ));
        self
    }

    /// Segment 1, field `foo`: three utf8 terms; `int` is rejected.
    pub fn small_dictionary() -> Self {
        let target = SegmentFieldRef::new(1, "foo");
        Self::default()
            .route(&target, Encoding::Utf8, None, Ok(small_listing()))
            .route(
                &target,
                Encoding::Int,
                None,
                Err(encoding_rejection("foo", Encoding::Int)),
            )
    }

    /// Segment 1, field `foo`: 55 utf8 terms split over two pages.
    pub fn large_dictionary() -> Self {
        let target = SegmentFieldRef::new(1, "foo");
        Self::default()
            .route(&target, Encoding::Utf8, None, Ok(full_page_listing()))
            .route(&target, Encoding::Utf8, Some("fa"), Ok(tail_listing()))
    }

    pub fn requests(&self) -> Vec<TermPageRequest> {
        self.seen.lock().clone()
    }
}

impl TermSource for ScriptedSource {
    fn fetch_page(&self, request: &TermPageRequest) -> Result<TermListing, FetchFailure> {
        self.seen.lock().push(request.clone());
        let key = Route {
            segment_id: request.segment_id,
            field_name: request.field_name.clone(),
            encoding: request.encoding,
            from: request.from.clone(),
        };
        self.routes
            .iter()
            .find(|(route, _)| *route == key)
            .map_or_else(
                || {
                    Err(FetchFailure::Rejected {
                        status: 404,
                        code: 404,
                        message: format!("no such field {}", request.field_name),
                    })
                },
                |(_, result)| result.clone(),
            )
    }
}

// ──────────────────── gated source ────────────────────

/// Blocks every fetch until [`GateSource::open`] is called.
#[derive(Clone)]
pub struct GateSource {
    gate: Arc<(Mutex<bool>, Condvar)>,
    result: Result<TermListing, FetchFailure>,
    calls: Arc<AtomicUsize>,
}

impl GateSource {
    pub fn new(result: Result<TermListing, FetchFailure>) -> Self {
        Self {
            gate: Arc::new((Mutex::new(false), Condvar::new())),
            result,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.gate;
        *lock.lock() = true;
        cvar.notify_all();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TermSource for GateSource {
    fn fetch_page(&self, _request: &TermPageRequest) -> Result<TermListing, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (lock, cvar) = &*self.gate;
        let mut open = lock.lock();
        while !*open {
            cvar.wait(&mut open);
        }
        self.result.clone()
    }
}

// ──────────────────── notifier ────────────────────

/// Notifier that keeps every message for later assertions.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}

// ──────────────────── headless driver ────────────────────

/// Synchronous driver: runs `update()` and resolves fetches inline against a
/// [`TermSource`], capturing notifications and rendered frames.
pub struct BrowserHarness<S: TermSource> {
    pub model: BrowserModel,
    pub source: S,
    pub notifications: Vec<String>,
    pub frames: Vec<String>,
}

impl<S: TermSource> BrowserHarness<S> {
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            model: BrowserModel::new(SegmentFieldRef::new(1, "foo"), page_size),
            source,
            notifications: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Apply `msg` and run every resulting command to completion.
    pub fn send(&mut self, msg: BrowserMsg) {
        let mut cmd = update::update(&mut self.model, msg);
        loop {
            match cmd {
                BrowserCmd::Fetch { ticket, request } => {
                    let result = self.source.fetch_page(&request);
                    let resolved = BrowserMsg::PageResolved { ticket, result };
                    cmd = update::update(&mut self.model, resolved);
                }
                BrowserCmd::Notify(message) => {
                    self.notifications.push(message);
                    break;
                }
                BrowserCmd::None => break,
            }
        }
        self.frames
            .push(render::render(&self.model.state, self.model.phase));
    }

    pub fn last_frame(&self) -> &str {
        self.frames.last().map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::model::Phase;

    #[test]
    fn scenario_a_three_terms_without_load_more() {
        let mut h = BrowserHarness::new(ScriptedSource::small_dictionary(), 50);
        h.send(BrowserMsg::Mount);
        assert_eq!(h.model.phase, Phase::Ready);
        assert_eq!(h.model.state.terms.len(), 3);
        assert!(h.last_frame().contains("Term count        101"));
        assert!(h.last_frame().contains("Docs with terms   19"));
        assert!(!h.last_frame().contains("Load more"));
        assert!(h.notifications.is_empty());
    }

    #[test]
    fn scenario_b_int_rejected_with_one_notification() {
        let mut h = BrowserHarness::new(ScriptedSource::small_dictionary(), 50);
        h.send(BrowserMsg::Mount);
        h.send(BrowserMsg::ChangeEncoding(Encoding::Int));
        assert_eq!(
            h.notifications,
            vec!["int is not a valid encoding for this field".to_owned()]
        );
        assert_eq!(h.model.state.encoding, Encoding::Utf8);
        assert_eq!(h.model.state.terms.len(), 3);
        assert!(h.last_frame().contains("[utf8]"));
    }

    #[test]
    fn scenarios_c_and_d_paginate_to_exhaustion() {
        let mut h = BrowserHarness::new(ScriptedSource::large_dictionary(), 50);
        h.send(BrowserMsg::Mount);
        assert_eq!(h.model.state.terms.len(), 50);
        assert!(h.last_frame().contains("Load more (50 shown)"));

        h.send(BrowserMsg::LoadMore);
        assert_eq!(h.model.state.terms.len(), 55);
        assert!(!h.model.state.has_more);
        assert!(!h.last_frame().contains("Load more"));

        let requests = h.source.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].count, 51);
        assert_eq!(requests[1].from.as_deref(), Some("fa"));
    }

    #[test]
    fn unknown_field_settles_empty() {
        let mut h = BrowserHarness::new(ScriptedSource::default(), 50);
        h.send(BrowserMsg::Mount);
        assert_eq!(h.model.phase, Phase::Ready);
        assert!(h.model.state.terms.is_empty());
        assert_eq!(h.notifications, vec!["no such field foo".to_owned()]);
        assert!(h.last_frame().contains("(no terms)"));
    }
}
