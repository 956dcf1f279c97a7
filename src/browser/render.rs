//! Plain-text projection of a browser snapshot.
//!
//! Rendering is stateless: the same state and phase always produce the same
//! text. Nothing here can trigger a fetch; hosts map the reported controls
//! back onto `change_encoding` / `load_more` themselves.

use std::fmt::Write as _;

use crate::browser::encoding::Encoding;
use crate::browser::model::{BrowserState, Phase};

const TERM_WIDTH: usize = 40;

/// Which controls a host should offer for the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub encoding_enabled: bool,
    /// The load-more affordance exists at all.
    pub load_more_visible: bool,
    pub load_more_enabled: bool,
}

impl Controls {
    #[must_use]
    pub fn for_state(state: &BrowserState, phase: Phase) -> Self {
        let ready = phase == Phase::Ready;
        Self {
            encoding_enabled: ready,
            load_more_visible: state.has_more,
            load_more_enabled: ready && state.has_more,
        }
    }
}

/// Render the full view: aggregates, encoding selector, rows, load more.
#[must_use]
pub fn render(state: &BrowserState, phase: Phase) -> String {
    let controls = Controls::for_state(state, phase);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Field {} (segment {}) [{}]",
        state.segment_field.field_name,
        state.segment_field.segment_id,
        phase.label()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<16}  {}", "Term count", count_label(state.term_count));
    let _ = writeln!(
        out,
        "  {:<16}  {}",
        "Docs with terms",
        count_label(state.doc_count)
    );
    let _ = writeln!(out, "  {:<16}  {}", "Min term", state.min_term);
    let _ = writeln!(out, "  {:<16}  {}", "Max term", state.max_term);
    let _ = writeln!(out);

    let _ = write!(out, "  Encoding:");
    for encoding in Encoding::all() {
        if *encoding == state.encoding {
            let _ = write!(out, " [{}]", encoding.tag());
        } else {
            let _ = write!(out, " {}", encoding.tag());
        }
    }
    if !controls.encoding_enabled {
        let _ = write!(out, " (disabled)");
    }
    let _ = writeln!(out);
    let _ = writeln!(out);

    if state.terms.is_empty() {
        let _ = writeln!(out, "  (no terms)");
    } else {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>10}  {:>14}",
            "Term",
            "Doc freq",
            "Total freq",
            width = TERM_WIDTH
        );
        let _ = writeln!(out, "  {}", "-".repeat(TERM_WIDTH + 28));
        for record in &state.terms {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>10}  {:>14}",
                truncate(&record.term, TERM_WIDTH),
                record.doc_freq,
                record.total_term_freq,
                width = TERM_WIDTH
            );
        }
    }

    if controls.load_more_visible {
        let _ = writeln!(out);
        if controls.load_more_enabled {
            let _ = writeln!(out, "  Load more ({} shown)", state.terms.len());
        } else {
            let _ = writeln!(out, "  Load more (disabled)");
        }
    }
    if let Some(error) = &state.last_error {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Last error ({}): {}", error.code, error.message);
    }
    out
}

/// Negative counts mean the index does not track the value.
fn count_label(value: i64) -> String {
    if value < 0 {
        "n/a".to_string()
    } else {
        value.to_string()
    }
}

fn truncate(term: &str, max_chars: usize) -> String {
    if term.chars().count() <= max_chars {
        return term.to_string();
    }
    let kept: String = term.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
