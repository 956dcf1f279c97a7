//! Property-based tests for browser state machine invariants.
//!
//! Drives `update()` with arbitrary trigger/resolution sequences against a
//! simulated sorted dictionary and checks pagination, rollback and discard
//! invariants after every step.

use proptest::prelude::*;

use super::encoding::{ALL_ENCODINGS, Encoding};
use super::fetcher::{FetchFailure, TermPageRequest};
use super::model::{
    BrowserCmd, BrowserModel, BrowserMsg, BrowserState, Phase, SegmentFieldRef, TermListing,
    TermRecord,
};
use super::update::update;

// ──────────────────── simulated backend ────────────────────

/// Sorted, de-duplicated dictionary served with inclusive `from`.
#[derive(Debug, Clone)]
struct Dictionary {
    terms: Vec<String>,
    /// Encodings the backend refuses with a 400.
    rejected: Vec<Encoding>,
}

impl Dictionary {
    fn serve(&self, request: &TermPageRequest) -> Result<TermListing, FetchFailure> {
        if self.rejected.contains(&request.encoding) {
            return Err(FetchFailure::Rejected {
                status: 400,
                code: 400,
                message: "cannot decode".into(),
            });
        }
        let start = request.from.as_ref().map_or(0, |from| {
            self.terms.partition_point(|t| t.as_str() < from.as_str())
        });
        let terms = self
            .terms
            .iter()
            .skip(start)
            .take(request.count)
            .map(|t| TermRecord {
                term: t.clone(),
                doc_freq: 1,
                total_term_freq: 1,
            })
            .collect();
        Ok(TermListing {
            term_count: i64::try_from(self.terms.len()).unwrap_or(i64::MAX),
            doc_count: 1,
            min_term: self.terms.first().cloned().unwrap_or_default(),
            max_term: self.terms.last().cloned().unwrap_or_default(),
            terms,
        })
    }
}

#[derive(Debug, Clone)]
enum Op {
    LoadMore,
    ChangeEncoding(Encoding),
    Deliver,
    DeliverNetworkFailure,
    DeliverStale,
    Unmount,
}

// ──────────────────── strategies ────────────────────

fn arb_dictionary() -> impl Strategy<Value = Dictionary> {
    (
        prop::collection::btree_set("[a-z]{1,4}", 0..120),
        prop::collection::vec(prop::sample::select(ALL_ENCODINGS.to_vec()), 0..3),
    )
        .prop_map(|(terms, rejected)| Dictionary {
            terms: terms.into_iter().collect(),
            rejected: rejected
                .into_iter()
                .filter(|e| *e != Encoding::Utf8)
                .collect(),
        })
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::LoadMore),
        2 => prop::sample::select(ALL_ENCODINGS.to_vec()).prop_map(Op::ChangeEncoding),
        6 => Just(Op::Deliver),
        1 => Just(Op::DeliverNetworkFailure),
        1 => Just(Op::DeliverStale),
        1 => Just(Op::Unmount),
    ]
}

// ──────────────────── driver ────────────────────

struct Sim {
    model: BrowserModel,
    dict: Dictionary,
    pending: Option<(u64, TermPageRequest)>,
    notifications: usize,
}

impl Sim {
    fn mounted(dict: Dictionary, page_size: usize) -> Self {
        let mut sim = Self {
            model: BrowserModel::new(SegmentFieldRef::new(1, "foo"), page_size),
            dict,
            pending: None,
            notifications: 0,
        };
        sim.send(BrowserMsg::Mount);
        sim
    }

    fn send(&mut self, msg: BrowserMsg) {
        match update(&mut self.model, msg) {
            BrowserCmd::Fetch { ticket, request } => {
                assert!(self.pending.is_none(), "second fetch issued while pending");
                self.pending = Some((ticket, request));
            }
            BrowserCmd::Notify(_) => self.notifications += 1,
            BrowserCmd::None => {}
        }
    }

    fn step(&mut self, op: &Op) {
        match op {
            Op::LoadMore => self.send(BrowserMsg::LoadMore),
            Op::ChangeEncoding(e) => self.send(BrowserMsg::ChangeEncoding(*e)),
            Op::Deliver => {
                if let Some((ticket, request)) = self.pending.take() {
                    let result = self.dict.serve(&request);
                    self.send(BrowserMsg::PageResolved { ticket, result });
                }
            }
            Op::DeliverNetworkFailure => {
                if let Some((ticket, _)) = self.pending.take() {
                    self.send(BrowserMsg::PageResolved {
                        ticket,
                        result: Err(FetchFailure::Network {
                            details: "reset".into(),
                        }),
                    });
                }
            }
            Op::DeliverStale => {
                let ticket = self.model.next_ticket.wrapping_add(1000);
                self.send(BrowserMsg::PageResolved {
                    ticket,
                    result: Ok(TermListing {
                        term_count: 0,
                        doc_count: 0,
                        min_term: String::new(),
                        max_term: String::new(),
                        terms: Vec::new(),
                    }),
                });
            }
            Op::Unmount => self.send(BrowserMsg::Unmount),
        }
    }
}

fn term_names(state: &BrowserState) -> Vec<&str> {
    state.terms.iter().map(|t| t.term.as_str()).collect()
}

/// Invariants that hold in every settled or in-flight state.
fn assert_invariants(sim: &Sim) {
    let model = &sim.model;
    let state = &model.state;
    let shown = term_names(state);

    // Terms always form a prefix of the dictionary.
    let prefix: Vec<&str> = sim.dict.terms.iter().take(shown.len()).map(String::as_str).collect();
    assert_eq!(shown, prefix, "terms are not a dictionary prefix");

    if model.phase != Phase::Unmounted {
        assert_eq!(
            model.phase.is_in_flight(),
            model.pending_ticket.is_some(),
            "in-flight phase and pending ticket disagree"
        );
    }

    if state.has_more {
        // Cursor is the first term not yet shown.
        assert_eq!(
            state.cursor.from.as_deref(),
            sim.dict.terms.get(shown.len()).map(String::as_str)
        );
        assert!(shown.len() < sim.dict.terms.len());
    } else if state.last_error.is_none() && model.phase == Phase::Ready {
        assert_eq!(state.cursor.from, None);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any op sequence keeps terms a dictionary prefix with a consistent cursor.
    #[test]
    fn op_sequences_preserve_invariants(
        dict in arb_dictionary(),
        page_size in 1usize..12,
        ops in prop::collection::vec(arb_op(), 1..60)
    ) {
        let mut sim = Sim::mounted(dict, page_size);
        assert_invariants(&sim);
        for op in &ops {
            sim.step(op);
            assert_invariants(&sim);
        }
    }

    /// A successful load-more only appends, and by at most `page_size` rows.
    #[test]
    fn load_more_is_pure_append(
        dict in arb_dictionary(),
        page_size in 1usize..12,
        rounds in 1usize..15
    ) {
        let mut sim = Sim::mounted(dict, page_size);
        sim.step(&Op::Deliver);
        for _ in 0..rounds {
            let before = sim.model.state.terms.clone();
            let had_more = sim.model.state.has_more;
            sim.step(&Op::LoadMore);
            sim.step(&Op::Deliver);
            let after = &sim.model.state.terms;
            prop_assert!(after.len() >= before.len());
            prop_assert_eq!(&after[..before.len()], &before[..]);
            prop_assert!(after.len() - before.len() <= page_size);
            if !had_more {
                prop_assert_eq!(after.len(), before.len());
            }
        }
    }

    /// Loading until exhaustion shows the whole dictionary exactly once.
    #[test]
    fn exhaustion_shows_every_term(
        dict in arb_dictionary(),
        page_size in 1usize..12
    ) {
        let total = dict.terms.len();
        let mut sim = Sim::mounted(dict, page_size);
        sim.step(&Op::Deliver);
        let mut guard = 0;
        while sim.model.state.has_more {
            sim.step(&Op::LoadMore);
            sim.step(&Op::Deliver);
            guard += 1;
            prop_assert!(guard <= total + 1, "pagination did not terminate");
        }
        prop_assert_eq!(sim.model.state.terms.len(), total);

        // Exhausted: further load-more issues nothing.
        sim.step(&Op::LoadMore);
        prop_assert!(sim.pending.is_none());
    }

    /// Rejected encodings roll back to the exact prior state, apart from
    /// the recorded error, and notify exactly once.
    #[test]
    fn rejected_encoding_rolls_back(
        dict in arb_dictionary(),
        page_size in 1usize..12,
        encoding in prop::sample::select(ALL_ENCODINGS[1..].to_vec())
    ) {
        let mut dict = dict;
        dict.rejected.push(encoding);
        let mut sim = Sim::mounted(dict, page_size);
        sim.step(&Op::Deliver);
        let before = sim.model.state.clone();
        let notified = sim.notifications;
        sim.step(&Op::ChangeEncoding(encoding));
        sim.step(&Op::Deliver);
        let after = &sim.model.state;
        prop_assert_eq!(sim.notifications, notified + 1);
        prop_assert_eq!(after.encoding, before.encoding);
        prop_assert_eq!(&after.terms, &before.terms);
        prop_assert_eq!(&after.cursor, &before.cursor);
        prop_assert_eq!(after.has_more, before.has_more);
        prop_assert!(after.last_error.is_some());
    }

    /// Nothing changes the state once unmounted.
    #[test]
    fn unmount_freezes_state(
        dict in arb_dictionary(),
        page_size in 1usize..12,
        ops in prop::collection::vec(arb_op(), 0..30)
    ) {
        let mut sim = Sim::mounted(dict, page_size);
        sim.step(&Op::Unmount);
        let frozen = sim.model.state.clone();
        let notified = sim.notifications;
        for op in &ops {
            sim.step(op);
        }
        prop_assert_eq!(sim.model.phase, Phase::Unmounted);
        prop_assert_eq!(&sim.model.state, &frozen);
        prop_assert_eq!(sim.notifications, notified);
    }

    /// Stale resolutions never touch state or notify.
    #[test]
    fn stale_tickets_are_discarded(
        dict in arb_dictionary(),
        page_size in 1usize..12
    ) {
        let mut sim = Sim::mounted(dict, page_size);
        let before_phase = sim.model.phase;
        let before = sim.model.state.clone();
        sim.step(&Op::DeliverStale);
        prop_assert_eq!(sim.model.phase, before_phase);
        prop_assert_eq!(&sim.model.state, &before);
        prop_assert_eq!(sim.notifications, 0);
    }
}
