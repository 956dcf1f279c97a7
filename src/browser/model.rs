//! Elm-style state model for the term browser.
//!
//! All browsing state lives in [`BrowserModel`]. Triggers and fetch
//! resolutions arrive as [`BrowserMsg`] values; side-effects are represented
//! as [`BrowserCmd`] values returned from the update function.
//!
//! **Design invariant:** the model is deterministic and performs no I/O.

use serde::{Deserialize, Serialize};

use crate::browser::encoding::Encoding;
use crate::browser::fetcher::{FetchFailure, TermPageRequest};

/// Nominal number of term rows shown per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page size the browser will request.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`.
#[must_use]
pub const fn clamp_page_size(page_size: usize) -> usize {
    if page_size == 0 {
        1
    } else if page_size > MAX_PAGE_SIZE {
        MAX_PAGE_SIZE
    } else {
        page_size
    }
}

// ──────────────────── wire shapes ────────────────────

/// Identity of what is being browsed. Never mutated by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFieldRef {
    pub segment_id: u32,
    pub field_name: String,
}

impl SegmentFieldRef {
    #[must_use]
    pub fn new(segment_id: u32, field_name: impl Into<String>) -> Self {
        Self {
            segment_id,
            field_name: field_name.into(),
        }
    }
}

/// One term dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRecord {
    pub term: String,
    /// Documents containing the term at least once.
    pub doc_freq: u64,
    /// Occurrences of the term across all documents.
    pub total_term_freq: u64,
}

/// Successful response body for one term page.
///
/// The four aggregate fields describe the whole field, not the page, and are
/// authoritative on every fetch. `termCount` may be `-1` when the index does
/// not track it, hence the signed types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermListing {
    pub term_count: i64,
    pub doc_count: i64,
    pub min_term: String,
    pub max_term: String,
    pub terms: Vec<TermRecord>,
}

// ──────────────────── browser state ────────────────────

/// Resume point for the next page. `from == None` means start of dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub from: Option<String>,
}

/// Failure surfaced on the state settled after a rejected action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i64,
    pub message: String,
}

impl From<&FetchFailure> for ErrorInfo {
    fn from(failure: &FetchFailure) -> Self {
        Self {
            code: failure.code(),
            message: failure.message(),
        }
    }
}

/// The published snapshot consumed by renderers.
///
/// Replaced wholesale on every fetch resolution, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserState {
    pub segment_field: SegmentFieldRef,
    pub encoding: Encoding,
    /// Accumulated prefix of the field's dictionary, in server order.
    pub terms: Vec<TermRecord>,
    pub term_count: i64,
    pub doc_count: i64,
    pub min_term: String,
    pub max_term: String,
    pub has_more: bool,
    pub cursor: Cursor,
    pub last_error: Option<ErrorInfo>,
}

impl BrowserState {
    /// Empty-but-valid state: no terms, nothing more to load.
    #[must_use]
    pub fn empty(segment_field: SegmentFieldRef, encoding: Encoding) -> Self {
        Self {
            segment_field,
            encoding,
            terms: Vec::new(),
            term_count: 0,
            doc_count: 0,
            min_term: String::new(),
            max_term: String::new(),
            has_more: false,
            cursor: Cursor::default(),
            last_error: None,
        }
    }

    /// Copy of this state carrying `error` as its last failure.
    #[must_use]
    pub fn with_error(&self, error: ErrorInfo) -> Self {
        Self {
            last_error: Some(error),
            ..self.clone()
        }
    }
}

// ──────────────────── phases ────────────────────

/// Lifecycle phase of the browser.
///
/// `Loading`, `Validating` and `LoadingMore` each mean exactly one fetch is in
/// flight; the current [`BrowserState`] is kept untouched as the rollback
/// target (or the base to extend).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    /// Created, not yet mounted.
    #[default]
    Idle,
    /// Initial fetch in flight.
    Loading,
    /// Stable and displayable; the only phase accepting triggers.
    Ready,
    /// Encoding-change fetch in flight.
    Validating { target: Encoding },
    /// Next-page fetch in flight.
    LoadingMore,
    /// Torn down; every later resolution is discarded.
    Unmounted,
}

impl Phase {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Validating { .. } => "validating",
            Self::LoadingMore => "loading_more",
            Self::Unmounted => "unmounted",
        }
    }

    /// Whether a fetch is logically outstanding.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Validating { .. } | Self::LoadingMore
        )
    }
}

// ──────────────────── messages / commands ────────────────────

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserMsg {
    /// Widget mounted: load the first page in `utf8`.
    Mount,
    /// User picked an encoding.
    ChangeEncoding(Encoding),
    /// User asked for the next page.
    LoadMore,
    /// A previously issued fetch finished.
    PageResolved {
        ticket: u64,
        result: Result<TermListing, FetchFailure>,
    },
    /// Widget torn down.
    Unmount,
}

/// Side-effects requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCmd {
    None,
    /// Issue exactly one fetch; its resolution must come back with `ticket`.
    Fetch {
        ticket: u64,
        request: TermPageRequest,
    },
    /// Tell the host about a rejected action.
    Notify(String),
}

/// Why a trigger was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// A fetch is already outstanding (or the browser is not mounted).
    NotReady(Phase),
    /// `LoadMore` with the dictionary already exhausted.
    Exhausted,
    /// Resolution for a ticket that is no longer pending.
    StaleTicket(u64),
}

// ──────────────────── model ────────────────────

/// Single source of truth for one browser instance.
#[derive(Debug, Clone)]
pub struct BrowserModel {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Last settled state (also the rollback target while a fetch is pending).
    pub state: BrowserState,
    /// Ticket of the one outstanding fetch, if any.
    pub pending_ticket: Option<u64>,
    /// Rows displayed per page; requests ask for one more.
    pub page_size: usize,
    /// Monotonic ticket counter.
    pub next_ticket: u64,
    /// Most recently dropped trigger, for diagnostics.
    pub last_ignored: Option<IgnoredReason>,
}

impl BrowserModel {
    /// Fresh, unmounted model for `target`.
    #[must_use]
    pub fn new(target: SegmentFieldRef, page_size: usize) -> Self {
        Self {
            phase: Phase::Idle,
            state: BrowserState::empty(target, Encoding::Utf8),
            pending_ticket: None,
            page_size: clamp_page_size(page_size),
            next_ticket: 0,
            last_ignored: None,
        }
    }

    /// What the browser is pointed at.
    #[must_use]
    pub fn target(&self) -> &SegmentFieldRef {
        &self.state.segment_field
    }

    /// Rows requested per fetch (`page_size + 1` lookahead row).
    #[must_use]
    pub const fn requested_count(&self) -> usize {
        self.page_size + 1
    }

    /// Whether the load-more control should be enabled.
    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.phase == Phase::Ready && self.state.has_more
    }

    /// Whether the encoding selector should be enabled.
    #[must_use]
    pub fn can_change_encoding(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Allocate the ticket for a new fetch and mark it pending.
    pub fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.pending_ticket = Some(ticket);
        ticket
    }
}
