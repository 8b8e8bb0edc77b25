//! Discovery session and externally visible scan state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;

use crate::report::{Progress, ScanOutcome, ScanReport, ScanWarning};

/// What the discovery lock holder is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// Waiting on the top-level `help` probe.
    ScanningTop,
    /// Walking the worklist.
    ScanningNodes,
}

/// How the last scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanEnd {
    Completed,
    Cancelled,
    Failed,
}

impl From<ScanOutcome> for ScanEnd {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Completed => Self::Completed,
            // A paused session only ends through cancel.
            ScanOutcome::Cancelled | ScanOutcome::Paused => Self::Cancelled,
        }
    }
}

/// Orchestrator state.
///
/// `Idle → Locked(ScanningTop) → Locked(ScanningNodes) ⇄ Paused → Idle`.
/// Both `Locked` and `Paused` hold the discovery lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle { last: Option<ScanEnd> },
    Locked(ScanPhase),
    Paused,
}

impl Default for ScanState {
    fn default() -> Self {
        Self::Idle { last: None }
    }
}

impl ScanState {
    /// Returns `true` while a session holds the discovery lock.
    pub fn holds_lock(&self) -> bool {
        !matches!(self, Self::Idle { .. })
    }
}

/// Snapshot published through [`subscribe`](crate::DiscoveryOrchestrator::subscribe).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatus {
    pub state: ScanState,
    pub progress: Progress,
    /// Path of the node whose probe is in flight.
    pub probing: Option<Vec<String>>,
}

/// Cooperative control flags, checked at probe boundaries.
#[derive(Debug, Default)]
pub(crate) struct ScanControl {
    cancel: AtomicBool,
    pause: AtomicBool,
}

impl ScanControl {
    pub(crate) fn reset(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub(crate) fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Consumes a pending pause request.
    pub(crate) fn take_pause(&self) -> bool {
        self.pause.swap(false, Ordering::SeqCst)
    }
}

/// The single holder of the discovery lock.
///
/// Dropping the session releases the lock.
#[derive(Debug)]
pub(crate) struct DiscoverySession {
    _guard: OwnedMutexGuard<()>,
    /// Full paths still to visit, resolved from the root on each visit.
    pub(crate) worklist: VecDeque<Vec<String>>,
    pub(crate) processed: usize,
    pub(crate) probes_sent: usize,
    pub(crate) nodes_attached: usize,
    pub(crate) skipped: usize,
    pub(crate) warnings: Vec<ScanWarning>,
    started: Instant,
    /// Start of the current run, for long-scan governance.
    pub(crate) resumed: Instant,
}

impl DiscoverySession {
    pub(crate) fn new(guard: OwnedMutexGuard<()>) -> Self {
        let now = Instant::now();
        Self {
            _guard: guard,
            worklist: VecDeque::new(),
            processed: 0,
            probes_sent: 0,
            nodes_attached: 0,
            skipped: 0,
            warnings: Vec::new(),
            started: now,
            resumed: now,
        }
    }

    pub(crate) fn progress(&self) -> Progress {
        Progress {
            current: self.processed,
            total: self.processed + self.worklist.len(),
        }
    }

    pub(crate) fn report(&self, outcome: ScanOutcome) -> ScanReport {
        ScanReport {
            outcome,
            probes_sent: self.probes_sent,
            nodes_attached: self.nodes_attached,
            skipped: self.skipped,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            progress: self.progress(),
            warnings: self.warnings.clone(),
        }
    }
}
