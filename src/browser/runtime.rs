//! Runtime host for one term browser instance.
//!
//! [`TermBrowser`] owns the model, feeds triggers through `update()`, and
//! executes the returned commands: fetches go to a worker thread, notify
//! messages go to the injected [`Notifier`]. Fetch resolutions are only applied
//! when the host calls [`TermBrowser::poll`] or [`TermBrowser::wait`], so every
//! state transition happens on the host's thread.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{self as channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::RwLock;

use crate::browser::encoding::Encoding;
use crate::browser::fetcher::{FetchFailure, TermPageRequest, TermSource};
use crate::browser::model::{
    BrowserCmd, BrowserModel, BrowserMsg, BrowserState, DEFAULT_PAGE_SIZE, IgnoredReason, Phase,
    SegmentFieldRef, TermListing,
};
use crate::browser::update::update;
use crate::core::errors::{Result, TermscopeError};
use crate::logger::activity::{ActivityEvent, ActivityLog};

// ──────────────────── host ports ────────────────────

/// Host alerting channel. Called exactly once per rejected action.
pub trait Notifier: Send {
    fn notify(&mut self, message: &str);
}

impl<F> Notifier for F
where
    F: FnMut(&str) + Send,
{
    fn notify(&mut self, message: &str) {
        self(message);
    }
}

/// Inputs handed over by the host when creating a browser.
#[derive(Debug, Clone)]
pub struct BrowserProps {
    pub target: SegmentFieldRef,
    /// Opaque host data; forwarded, never interpreted.
    pub index_data: Option<serde_json::Value>,
    pub page_size: usize,
}

impl BrowserProps {
    #[must_use]
    pub fn new(segment_id: u32, field_name: impl Into<String>) -> Self {
        Self {
            target: SegmentFieldRef::new(segment_id, field_name),
            index_data: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_index_data(mut self, index_data: serde_json::Value) -> Self {
        self.index_data = Some(index_data);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

// ──────────────────── published snapshot ────────────────────

/// Read-only view of the latest settled state, shareable with renderers.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Snapshot>>,
}

/// What renderers read: the state plus the phase gating the controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: BrowserState,
    pub phase: Phase,
}

impl SnapshotHandle {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.inner.write() = snapshot;
    }

    /// Clone of the latest snapshot.
    #[must_use]
    pub fn read(&self) -> Snapshot {
        self.inner.read().clone()
    }
}

// ──────────────────── worker ────────────────────

struct FetchJob {
    ticket: u64,
    request: TermPageRequest,
}

struct FetchOutcome {
    ticket: u64,
    result: std::result::Result<TermListing, FetchFailure>,
    elapsed: Duration,
}

/// Single background thread performing fetches one at a time.
struct FetchWorker {
    jobs: Option<Sender<FetchJob>>,
    outcomes: Receiver<FetchOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    fn spawn(source: Arc<dyn TermSource>) -> Result<Self> {
        let (job_tx, job_rx) = channel::unbounded::<FetchJob>();
        let (outcome_tx, outcome_rx) = channel::unbounded::<FetchOutcome>();
        let handle = thread::Builder::new()
            .name("termscope-fetch".to_string())
            .spawn(move || {
                for job in &job_rx {
                    let started = Instant::now();
                    let result = source.fetch_page(&job.request);
                    let outcome = FetchOutcome {
                        ticket: job.ticket,
                        result,
                        elapsed: started.elapsed(),
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })
            .map_err(|error| TermscopeError::Runtime {
                details: format!("failed to spawn fetch worker: {error}"),
            })?;
        Ok(Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            handle: Some(handle),
        })
    }

    fn submit(&self, job: FetchJob) -> Result<()> {
        self.jobs
            .as_ref()
            .ok_or(TermscopeError::ChannelClosed {
                component: "fetch worker",
            })?
            .send(job)
            .map_err(|_| TermscopeError::ChannelClosed {
                component: "fetch worker",
            })
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop after its current fetch.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ──────────────────── browser ────────────────────

/// One mounted term browser.
pub struct TermBrowser {
    model: BrowserModel,
    props: BrowserProps,
    worker: FetchWorker,
    notifier: Box<dyn Notifier>,
    snapshot: SnapshotHandle,
    log: ActivityLog,
}

impl TermBrowser {
    /// Create an unmounted browser; call [`mount`](Self::mount) to start.
    pub fn new(
        props: BrowserProps,
        source: Arc<dyn TermSource>,
        notifier: impl Notifier + 'static,
    ) -> Result<Self> {
        let model = BrowserModel::new(props.target.clone(), props.page_size);
        let snapshot = SnapshotHandle::new(Snapshot {
            state: model.state.clone(),
            phase: model.phase,
        });
        Ok(Self {
            model,
            props,
            worker: FetchWorker::spawn(source)?,
            notifier: Box::new(notifier),
            snapshot,
            log: ActivityLog::disabled(),
        })
    }

    /// Attach an activity log.
    #[must_use]
    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.log = log;
        self
    }

    // ── triggers ──

    pub fn mount(&mut self) -> Result<()> {
        if self.model.phase == Phase::Idle {
            self.log.record(&ActivityEvent::Mounted {
                target: &self.props.target,
            });
        }
        self.dispatch(BrowserMsg::Mount, "mount")
    }

    pub fn change_encoding(&mut self, encoding: Encoding) -> Result<()> {
        self.dispatch(BrowserMsg::ChangeEncoding(encoding), "change_encoding")
    }

    pub fn load_more(&mut self) -> Result<()> {
        self.dispatch(BrowserMsg::LoadMore, "load_more")
    }

    /// Tear down: any fetch still in flight resolves into nothing.
    pub fn unmount(&mut self) {
        if self.model.phase == Phase::Unmounted {
            return;
        }
        let _ = update(&mut self.model, BrowserMsg::Unmount);
        self.log.record(&ActivityEvent::Unmounted {
            target: &self.props.target,
        });
        self.publish();
    }

    // ── resolutions ──

    /// Apply every fetch resolution that is already available. Returns how
    /// many resolutions were consumed.
    pub fn poll(&mut self) -> Result<usize> {
        let mut consumed = 0;
        loop {
            match self.worker.outcomes.try_recv() {
                Ok(outcome) => {
                    consumed += 1;
                    self.resolve(outcome)?;
                }
                Err(TryRecvError::Empty) => return Ok(consumed),
                Err(TryRecvError::Disconnected) => {
                    return Err(TermscopeError::ChannelClosed {
                        component: "fetch worker",
                    });
                }
            }
        }
    }

    /// Block until the outstanding fetch resolves or `timeout` passes.
    ///
    /// Returns `true` when the browser is no longer waiting on a fetch.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        while self.model.phase.is_in_flight() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.worker.outcomes.recv_timeout(remaining) {
                Ok(outcome) => self.resolve(outcome)?,
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TermscopeError::ChannelClosed {
                        component: "fetch worker",
                    });
                }
            }
        }
        Ok(true)
    }

    // ── reads ──

    #[must_use]
    pub fn state(&self) -> &BrowserState {
        &self.model.state
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.model.phase
    }

    #[must_use]
    pub fn model(&self) -> &BrowserModel {
        &self.model
    }

    #[must_use]
    pub fn index_data(&self) -> Option<&serde_json::Value> {
        self.props.index_data.as_ref()
    }

    /// Handle renderers can read from any thread.
    #[must_use]
    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    // ── internals ──

    fn dispatch(&mut self, msg: BrowserMsg, trigger: &'static str) -> Result<()> {
        let cmd = update(&mut self.model, msg);
        if cmd == BrowserCmd::None {
            if let Some(reason) = self.model.last_ignored {
                self.log
                    .record(&ActivityEvent::TriggerIgnored { trigger, reason });
            }
        }
        self.execute(cmd)?;
        self.publish();
        Ok(())
    }

    fn resolve(&mut self, outcome: FetchOutcome) -> Result<()> {
        let FetchOutcome {
            ticket,
            result,
            elapsed,
        } = outcome;
        let phase = self.model.phase;
        let rows = result.as_ref().map_or(0, |listing| listing.terms.len());
        let failure = result.as_ref().err().cloned();

        let cmd = update(&mut self.model, BrowserMsg::PageResolved { ticket, result });

        if self.model.last_ignored == Some(IgnoredReason::StaleTicket(ticket)) {
            self.log.record(&ActivityEvent::StaleDiscarded { ticket });
            return Ok(());
        }
        match &failure {
            None => self.log.record(&ActivityEvent::PageApplied {
                ticket,
                rows,
                state: &self.model.state,
                elapsed,
            }),
            Some(failure) => {
                self.log.record(&ActivityEvent::FetchFailed {
                    ticket,
                    phase,
                    failure,
                    elapsed,
                });
                if let Phase::Validating { target } = phase {
                    if failure.is_client_rejection() {
                        self.log.record(&ActivityEvent::EncodingRejected {
                            ticket,
                            target: target.tag(),
                            failure,
                        });
                    }
                }
            }
        }
        self.execute(cmd)?;
        self.publish();
        Ok(())
    }

    fn execute(&mut self, cmd: BrowserCmd) -> Result<()> {
        match cmd {
            BrowserCmd::Fetch { ticket, request } => {
                self.log.record(&ActivityEvent::FetchIssued {
                    ticket,
                    request: &request,
                });
                self.worker.submit(FetchJob { ticket, request })?;
            }
            BrowserCmd::Notify(message) => self.notifier.notify(&message),
            BrowserCmd::None => {}
        }
        Ok(())
    }

    fn publish(&self) {
        self.snapshot.publish(Snapshot {
            state: self.model.state.clone(),
            phase: self.model.phase,
        });
    }
}

impl Drop for TermBrowser {
    fn drop(&mut self) {
        self.unmount();
    }
}
