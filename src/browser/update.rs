//! Pure update function for the term browser state machine.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//!
//! **Design invariant:** this module performs zero I/O. All effects are
//! described as [`BrowserCmd`] values.

use crate::browser::accumulator::PaginationAccumulator;
use crate::browser::encoding::Encoding;
use crate::browser::fetcher::{FetchFailure, TermPageFetcher};
use crate::browser::model::{
    BrowserCmd, BrowserModel, BrowserMsg, BrowserState, ErrorInfo, IgnoredReason, Phase,
    TermListing,
};

/// Apply a message to the model and return the next command for the runtime.
///
/// At most one fetch is outstanding at a time: triggers arriving outside
/// [`Phase::Ready`] are dropped and recorded in `model.last_ignored`.
pub fn update(model: &mut BrowserModel, msg: BrowserMsg) -> BrowserCmd {
    match msg {
        BrowserMsg::Mount => {
            if model.phase != Phase::Idle {
                let reason = IgnoredReason::NotReady(model.phase);
                return ignore(model, reason);
            }
            model.phase = Phase::Loading;
            fetch(model, Encoding::Utf8, None)
        }

        BrowserMsg::ChangeEncoding(target) => {
            if model.phase != Phase::Ready {
                let reason = IgnoredReason::NotReady(model.phase);
                return ignore(model, reason);
            }
            model.phase = Phase::Validating { target };
            fetch(model, target, None)
        }

        BrowserMsg::LoadMore => {
            if model.phase != Phase::Ready {
                let reason = IgnoredReason::NotReady(model.phase);
                return ignore(model, reason);
            }
            if !model.state.has_more {
                return ignore(model, IgnoredReason::Exhausted);
            }
            model.phase = Phase::LoadingMore;
            let encoding = model.state.encoding;
            let from = model.state.cursor.from.clone();
            fetch(model, encoding, from.as_deref())
        }

        BrowserMsg::PageResolved { ticket, result } => {
            if model.phase == Phase::Unmounted || model.pending_ticket != Some(ticket) {
                return ignore(model, IgnoredReason::StaleTicket(ticket));
            }
            model.pending_ticket = None;
            match result {
                Ok(listing) => apply_success(model, listing),
                Err(failure) => apply_failure(model, &failure),
            }
        }

        BrowserMsg::Unmount => {
            model.phase = Phase::Unmounted;
            model.pending_ticket = None;
            BrowserCmd::None
        }
    }
}

/// Text shown to the user for a rejected action.
///
/// Encoding changes rejected by the backend itself (4xx) get the friendly
/// message; every other failure surfaces its raw message.
#[must_use]
pub fn failure_message(phase: Phase, failure: &FetchFailure) -> String {
    match phase {
        Phase::Validating { target } if failure.is_client_rejection() => {
            format!("{} is not a valid encoding for this field", target.tag())
        }
        _ => failure.message(),
    }
}

// ──────────────────── transitions ────────────────────

fn fetch(model: &mut BrowserModel, encoding: Encoding, from: Option<&str>) -> BrowserCmd {
    let request = TermPageFetcher::new(model.page_size).request(model.target(), encoding, from);
    let ticket = model.issue_ticket();
    model.last_ignored = None;
    BrowserCmd::Fetch { ticket, request }
}

fn ignore(model: &mut BrowserModel, reason: IgnoredReason) -> BrowserCmd {
    model.last_ignored = Some(reason);
    BrowserCmd::None
}

fn apply_success(model: &mut BrowserModel, listing: TermListing) -> BrowserCmd {
    let accumulator = PaginationAccumulator::new(model.page_size);
    let target = model.target().clone();
    model.state = match model.phase {
        Phase::Loading => accumulator.apply_first_page(target, Encoding::Utf8, listing),
        Phase::Validating { target: encoding } => {
            accumulator.apply_first_page(target, encoding, listing)
        }
        Phase::LoadingMore => accumulator.apply_next_page(&model.state, listing),
        // A ticket is only pending in the three fetch phases.
        Phase::Idle | Phase::Ready | Phase::Unmounted => return BrowserCmd::None,
    };
    model.phase = Phase::Ready;
    BrowserCmd::None
}

fn apply_failure(model: &mut BrowserModel, failure: &FetchFailure) -> BrowserCmd {
    let message = failure_message(model.phase, failure);
    let error = ErrorInfo::from(failure);
    model.state = match model.phase {
        // Nothing to roll back to: settle empty but valid.
        Phase::Loading => {
            BrowserState::empty(model.target().clone(), Encoding::Utf8).with_error(error)
        }
        // Keep the prior state (and its encoding) untouched apart from the error.
        Phase::Validating { .. } | Phase::LoadingMore => model.state.with_error(error),
        Phase::Idle | Phase::Ready | Phase::Unmounted => return BrowserCmd::None,
    };
    model.phase = Phase::Ready;
    BrowserCmd::Notify(message)
}
