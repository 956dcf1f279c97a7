//! Folding fetched pages into the running term list.
//!
//! Each request asks for `page_size + 1` rows. A full response means more
//! terms remain: only the first `page_size` rows are kept and the extra
//! row's term becomes the cursor. The backend treats `from` as inclusive, so
//! that row comes back as the first row of the next page. Oversized responses
//! are cut the same way and resume at row `page_size`.

use crate::browser::encoding::Encoding;
use crate::browser::model::{
    BrowserState, Cursor, SegmentFieldRef, TermListing, TermRecord, clamp_page_size,
};

/// Applies the page-size-plus-one rule to fetched listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationAccumulator {
    page_size: usize,
}

/// A listing split into displayable rows and the resume cursor.
struct PageSplit {
    rows: Vec<TermRecord>,
    has_more: bool,
    cursor: Cursor,
}

impl PaginationAccumulator {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: clamp_page_size(page_size),
        }
    }

    /// Rows asked of the backend per page.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.page_size + 1
    }

    /// Start a fresh listing: replaces all terms.
    #[must_use]
    pub fn apply_first_page(
        &self,
        segment_field: SegmentFieldRef,
        encoding: Encoding,
        listing: TermListing,
    ) -> BrowserState {
        let TermListing {
            term_count,
            doc_count,
            min_term,
            max_term,
            terms,
        } = listing;
        let split = self.split(terms);
        BrowserState {
            segment_field,
            encoding,
            terms: split.rows,
            term_count,
            doc_count,
            min_term,
            max_term,
            has_more: split.has_more,
            cursor: split.cursor,
            last_error: None,
        }
    }

    /// Extend `prev` with the next page. Existing rows are never reordered.
    #[must_use]
    pub fn apply_next_page(&self, prev: &BrowserState, listing: TermListing) -> BrowserState {
        let TermListing {
            term_count,
            doc_count,
            min_term,
            max_term,
            terms,
        } = listing;
        let split = self.split(terms);
        let mut accumulated = Vec::with_capacity(prev.terms.len() + split.rows.len());
        accumulated.extend_from_slice(&prev.terms);
        accumulated.extend(split.rows);
        BrowserState {
            segment_field: prev.segment_field.clone(),
            encoding: prev.encoding,
            terms: accumulated,
            term_count,
            doc_count,
            min_term,
            max_term,
            has_more: split.has_more,
            cursor: split.cursor,
            last_error: None,
        }
    }

    fn split(&self, mut terms: Vec<TermRecord>) -> PageSplit {
        if terms.len() < self.requested() {
            return PageSplit {
                rows: terms,
                has_more: false,
                cursor: Cursor::default(),
            };
        }
        let from = terms.get(self.page_size).map(|t| t.term.clone());
        terms.truncate(self.page_size);
        PageSplit {
            rows: terms,
            has_more: true,
            cursor: Cursor { from },
        }
    }
}
