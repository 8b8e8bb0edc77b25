//! Discovery orchestrator.
//!
//! Sequences probes over one shared channel: the top-level `help` probe, then
//! a worklist walk that sends `<path> --help` for every node not yet settled.
//! Exactly one probe is outstanding at any time, and every probe happens while
//! a [`DiscoverySession`] holds the discovery lock.
//!
//! Pause and cancel are cooperative. Both are observed between probes, never
//! mid-probe, so a cancel takes effect within one probe's hard timeout. A
//! paused session keeps the lock until it is resumed or cancelled.
//!
//! The catalog is persisted after every successful attach. A failed write is
//! recorded as a [`WarningKind::PersistFailed`] warning and the walk goes on.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shell_catalog_core::{
    Catalog, DiscoveryState, MergeError, attach_children, merge_own_help, replace_roots,
};
use shell_catalog_store::CatalogStore;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::buffer::ResponseBuffer;
use crate::channel::{ChannelAdapter, DataCallback};
use crate::config::DiscoveryConfig;
use crate::error::{ConfigError, DiscoveryError, Result};
use crate::framer::{FramedResponse, ProbeKind, ResponseFramer};
use crate::parser::{HelpParser, ParseWarning};
use crate::prompt::PromptMatcher;
use crate::report::{Progress, ScanOutcome, ScanReport, ScanWarning, WarningKind};
use crate::session::{
    DiscoverySession, ScanControl, ScanEnd, ScanPhase, ScanState, ScanStatus,
};

/// State shared between the orchestrator and its [`ScanHandle`]s.
#[derive(Debug)]
struct Shared {
    control: ScanControl,
    parked: Mutex<Option<DiscoverySession>>,
    status: watch::Sender<ScanStatus>,
}

impl Shared {
    fn new() -> Self {
        Self {
            control: ScanControl::default(),
            parked: Mutex::new(None),
            status: watch::Sender::new(ScanStatus::default()),
        }
    }

    fn set_state(&self, state: ScanState) {
        self.status.send_modify(|status| status.state = state);
    }

    fn set_progress(&self, progress: Progress) {
        self.status.send_modify(|status| status.progress = progress);
    }

    fn set_probing(&self, path: Option<&[String]>) {
        self.status
            .send_modify(|status| status.probing = path.map(<[String]>::to_vec));
    }

    /// Ends a session. The state goes idle before the lock is released, so a
    /// scan that acquires the lock next always publishes over `Idle`.
    fn finish(&self, session: DiscoverySession, outcome: ScanOutcome) -> ScanReport {
        let report = session.report(outcome);
        self.status.send_modify(|status| {
            status.state = ScanState::Idle {
                last: Some(ScanEnd::from(outcome)),
            };
            status.progress = report.progress;
            status.probing = None;
        });
        drop(session);
        info!(
            outcome = %outcome,
            probes = report.probes_sent,
            attached = report.nodes_attached,
            skipped = report.skipped,
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed_ms,
            "discovery scan finished"
        );
        report
    }

    fn fail(&self, session: DiscoverySession, err: DiscoveryError) -> DiscoveryError {
        self.status.send_modify(|status| {
            status.state = ScanState::Idle {
                last: Some(ScanEnd::Failed),
            };
            status.probing = None;
        });
        drop(session);
        warn!(error = %err, "discovery scan failed");
        err
    }

    /// Parks a session with its lock held.
    ///
    /// A cancel that arrived after the last boundary check ends the session
    /// instead. The check runs under the `parked` mutex, the same one
    /// [`ScanHandle::cancel`] takes.
    fn park(&self, session: DiscoverySession) -> ScanReport {
        let mut parked = self.parked.lock();
        if self.control.is_cancelled() {
            drop(parked);
            return self.finish(session, ScanOutcome::Cancelled);
        }
        let report = session.report(ScanOutcome::Paused);
        *parked = Some(session);
        self.set_state(ScanState::Paused);
        drop(parked);
        info!(
            current = report.progress.current,
            total = report.progress.total,
            "discovery scan paused"
        );
        report
    }
}

/// Cloneable control surface for a running scan.
///
/// Safe to use from any task, including a UI loop that does not own the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    shared: Arc<Shared>,
}

impl ScanHandle {
    /// Requests a pause at the next probe boundary.
    ///
    /// Returns `false` when no scan is running.
    pub fn pause(&self) -> bool {
        if !matches!(self.state(), ScanState::Locked(_)) {
            return false;
        }
        self.shared.control.request_pause();
        true
    }

    /// Requests cancellation.
    ///
    /// A running walk stops at the next probe boundary and its scan call
    /// returns [`ScanOutcome::Cancelled`]. A paused session is ended here and
    /// its final report returned. Nodes attached so far are kept.
    pub fn cancel(&self) -> Option<ScanReport> {
        self.shared.control.request_cancel();
        let parked = self.shared.parked.lock().take();
        parked.map(|session| self.shared.finish(session, ScanOutcome::Cancelled))
    }

    pub fn state(&self) -> ScanState {
        self.shared.status.borrow().state
    }

    pub fn progress(&self) -> Progress {
        self.shared.status.borrow().progress
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ScanState::Paused
    }
}

/// Drives discovery scans against one shell.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use shell_catalog_discovery::{DiscoveryConfig, DiscoveryOrchestrator, TcpChannel};
/// use shell_catalog_store::FileCatalogStore;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = Arc::new(TcpChannel::new());
/// let store = Arc::new(FileCatalogStore::new("catalog.json"));
/// let orchestrator = DiscoveryOrchestrator::new(channel.clone(), store, DiscoveryConfig::default())?;
///
/// channel.set_data_callback(orchestrator.data_sink());
/// channel.connect("192.168.1.20:23").await?;
///
/// let report = orchestrator.start_scan(false).await?;
/// println!("{} probes, {} nodes", report.probes_sent, orchestrator.catalog().node_count());
/// # Ok(())
/// # }
/// ```
pub struct DiscoveryOrchestrator {
    channel: Arc<dyn ChannelAdapter>,
    store: Arc<dyn CatalogStore>,
    config: DiscoveryConfig,
    prompt: PromptMatcher,
    framer: ResponseFramer,
    catalog: RwLock<Catalog>,
    lock: Arc<tokio::sync::Mutex<()>>,
    shared: Arc<Shared>,
}

impl DiscoveryOrchestrator {
    /// Creates an orchestrator and loads the cached catalog, if any.
    ///
    /// A cache miss of any kind starts from an empty catalog, so the first
    /// scan probes the top level.
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        store: Arc<dyn CatalogStore>,
        config: DiscoveryConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let prompt = config.prompt_matcher()?;
        let framer = ResponseFramer::new(
            ResponseBuffer::new(),
            prompt.clone(),
            config.framer.clone(),
        );
        let catalog = store.load().unwrap_or_default();
        debug!(nodes = catalog.node_count(), "catalog loaded");

        Ok(Self {
            channel,
            store,
            config,
            prompt,
            framer,
            catalog: RwLock::new(catalog),
            lock: Arc::new(tokio::sync::Mutex::new(())),
            shared: Arc::new(Shared::new()),
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Snapshot of the current catalog.
    pub fn catalog(&self) -> Catalog {
        self.catalog.read().clone()
    }

    /// Discovery state of one node, for expand/spinner affordances.
    pub fn node_state<S: AsRef<str>>(&self, path: &[S]) -> Option<DiscoveryState> {
        self.catalog.read().node_state(path)
    }

    pub fn state(&self) -> ScanState {
        self.shared.status.borrow().state
    }

    pub fn progress(&self) -> Progress {
        self.shared.status.borrow().progress
    }

    /// Receives every state, progress and in-flight probe change.
    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.shared.status.subscribe()
    }

    pub fn handle(&self) -> ScanHandle {
        ScanHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Shorthand for [`ScanHandle::pause`].
    pub fn pause(&self) -> bool {
        self.handle().pause()
    }

    /// Shorthand for [`ScanHandle::cancel`].
    pub fn cancel(&self) -> Option<ScanReport> {
        self.handle().cancel()
    }

    /// Inbound data entry point for channels that deliver chunks by call.
    pub fn on_data(&self, chunk: &[u8]) {
        self.framer.buffer().push(chunk);
    }

    /// A data callback feeding [`on_data`](Self::on_data).
    pub fn data_sink(&self) -> DataCallback {
        self.framer.buffer().sink()
    }

    pub fn response_buffer(&self) -> &ResponseBuffer {
        self.framer.buffer()
    }

    fn acquire(&self) -> Result<DiscoverySession> {
        let guard = Arc::clone(&self.lock).try_lock_owned().map_err(|_| {
            debug!("scan rejected: discovery lock held");
            DiscoveryError::ConcurrentScanRejected
        })?;
        self.shared.control.reset();
        Ok(DiscoverySession::new(guard))
    }

    /// Runs a scan.
    ///
    /// The top level is probed when `force` is set or the catalog is empty;
    /// a forced rescan replaces the root list wholesale. The walk then visits
    /// every node reachable from the roots, skipping settled ones, until the
    /// worklist drains, a cancel is observed, or the scan pauses.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::ConcurrentScanRejected`] when another session holds
    ///   the lock (including a paused one). Nothing is mutated.
    /// - [`DiscoveryError::ChannelNotOpen`] when the channel is down.
    /// - [`DiscoveryError::NoCommandsFound`] when the top-level probe yields no
    ///   commands. The catalog is untouched.
    /// - [`DiscoveryError::Channel`] on a transport failure. Nodes attached
    ///   before the failure are kept.
    pub async fn start_scan(&self, force: bool) -> Result<ScanReport> {
        let mut session = self.acquire()?;
        info!(force, "discovery scan started");

        if !self.channel.is_open() {
            return Err(self.shared.fail(session, DiscoveryError::ChannelNotOpen));
        }

        let needs_top_level = force || self.catalog.read().is_empty();
        if needs_top_level {
            self.shared.set_state(ScanState::Locked(ScanPhase::ScanningTop));
            if let Err(err) = self.scan_top_level(&mut session).await {
                return Err(self.shared.fail(session, err));
            }
        }

        session.worklist = self
            .catalog
            .read()
            .commands
            .iter()
            .map(|c| c.full_path.clone())
            .collect();
        self.run(session).await
    }

    /// Continues a paused scan. The long-scan clock restarts.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::NotPaused`] when no session is parked.
    pub async fn resume(&self) -> Result<ScanReport> {
        let mut session = self
            .shared
            .parked
            .lock()
            .take()
            .ok_or(DiscoveryError::NotPaused)?;
        session.resumed = Instant::now();
        info!(remaining = session.worklist.len(), "discovery scan resumed");
        self.run(session).await
    }

    /// Probes exactly one node and attaches its children.
    ///
    /// A settled node is not re-probed. Children found are not walked.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::UnknownCommand`] when `path` is not in the catalog,
    /// plus the lock and channel errors of [`start_scan`](Self::start_scan).
    pub async fn discover_node<S: AsRef<str>>(&self, path: &[S]) -> Result<ScanReport> {
        let mut session = self.acquire()?;
        let path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();

        if self.catalog.read().find(&path).is_none() {
            let err = DiscoveryError::UnknownCommand(path.join(" "));
            return Err(self.shared.fail(session, err));
        }
        if !self.channel.is_open() {
            return Err(self.shared.fail(session, DiscoveryError::ChannelNotOpen));
        }

        self.shared
            .set_state(ScanState::Locked(ScanPhase::ScanningNodes));
        if let Err(err) = self.visit(&mut session, &path).await {
            return Err(self.shared.fail(session, err));
        }
        session.worklist.clear();
        session.processed = 1;
        Ok(self.shared.finish(session, ScanOutcome::Completed))
    }

    async fn scan_top_level(&self, session: &mut DiscoverySession) -> Result<()> {
        let response = self.probe(session, "help", ProbeKind::TopLevel).await?;
        let listing = HelpParser::top_level(&response.text)
            .with_prompt(self.prompt.clone())
            .parse();

        if listing.commands.is_empty() {
            debug!(
                bytes = response.text.len(),
                completion = ?response.completion,
                "top-level probe yielded no commands"
            );
            return Err(DiscoveryError::NoCommandsFound);
        }

        let count = listing.commands.len();
        replace_roots(&mut self.catalog.write(), listing.commands);
        session.nodes_attached += count;
        info!(commands = count, "top-level listing replaced");
        self.persist(session);
        Ok(())
    }

    async fn run(&self, mut session: DiscoverySession) -> Result<ScanReport> {
        self.shared
            .set_state(ScanState::Locked(ScanPhase::ScanningNodes));
        self.shared.set_progress(session.progress());
        let threshold = self.config.scan.long_scan_threshold();
        let delay = self.config.scan.inter_probe_delay();

        loop {
            if self.shared.control.is_cancelled() {
                return Ok(self.shared.finish(session, ScanOutcome::Cancelled));
            }
            if session.worklist.is_empty() {
                return Ok(self.shared.finish(session, ScanOutcome::Completed));
            }

            let over_threshold = threshold.is_some_and(|t| session.resumed.elapsed() >= t);
            if self.shared.control.take_pause() || over_threshold {
                return Ok(self.shared.park(session));
            }

            let Some(path) = session.worklist.pop_front() else {
                continue;
            };
            if let Err(err) = self.visit(&mut session, &path).await {
                return Err(self.shared.fail(session, err));
            }
            session.processed += 1;
            self.shared.set_progress(session.progress());

            if !session.worklist.is_empty() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Visits one worklist entry.
    async fn visit(&self, session: &mut DiscoverySession, path: &[String]) -> Result<()> {
        let label = path.join(" ");

        let (name, redundant, children, siblings) = {
            let catalog = self.catalog.read();
            let Some(node) = catalog.find(path) else {
                debug!(command = %label, "worklist entry no longer in catalog");
                return Ok(());
            };
            let siblings: Vec<String> = match path.split_last() {
                Some((_, parent)) if !parent.is_empty() => catalog
                    .find(parent)
                    .map(|p| p.children.iter().map(|c| c.name.clone()).collect())
                    .unwrap_or_default(),
                _ => catalog.commands.iter().map(|c| c.name.clone()).collect(),
            };
            (
                node.name.clone(),
                node.is_probe_redundant(),
                node.children
                    .iter()
                    .map(|c| c.full_path.clone())
                    .collect::<Vec<_>>(),
                siblings,
            )
        };

        if redundant {
            debug!(command = %label, "already discovered, skipping probe");
            session.skipped += 1;
            session.worklist.extend(children);
            return Ok(());
        }

        if self.config.scan.should_skip(&name) {
            debug!(command = %label, "on skip list, marking as leaf");
            self.attach(path, Vec::new())?;
            self.persist(session);
            return Ok(());
        }

        let probe = format!("{label} --help");
        self.shared.set_probing(Some(path));
        let response = self.probe(session, &probe, ProbeKind::Subcommand).await;
        self.shared.set_probing(None);
        let response = response?;

        let listing = HelpParser::for_node(path, &response.text)
            .with_prompt(self.prompt.clone())
            .with_siblings(siblings.iter().filter(|s| **s != name))
            .parse();

        if response.timed_out() && listing.commands.is_empty() {
            session.warnings.push(
                ScanWarning::new(WarningKind::ProbeTimeout, label.as_str()).with_detail(format!(
                    "no complete response within {}ms",
                    response.elapsed.as_millis()
                )),
            );
        }
        for warning in &listing.warnings {
            let kind = match warning {
                ParseWarning::Ambiguous(_) => WarningKind::ParseAmbiguity,
                ParseWarning::ParentEcho(_) => WarningKind::ParentEcho,
                other => {
                    debug!(command = %label, warning = %other, "parse warning");
                    continue;
                }
            };
            session
                .warnings
                .push(ScanWarning::new(kind, label.as_str()).with_detail(warning.to_string()));
        }

        let own = listing.own;
        let added = self.attach(path, listing.commands)?;
        if let Some(node) = self.catalog.write().find_mut(path) {
            merge_own_help(
                node,
                own.description.as_deref(),
                own.usage.as_deref(),
                &own.arguments,
            );
        }

        debug!(
            command = %label,
            children = added.len(),
            completion = ?response.completion,
            "node discovered"
        );
        session.nodes_attached += added.len();
        session.worklist.extend(added);
        self.persist(session);
        Ok(())
    }

    /// Additive attach. Returns the full paths of the new children.
    fn attach(
        &self,
        path: &[String],
        children: Vec<shell_catalog_core::CommandNode>,
    ) -> Result<Vec<Vec<String>>> {
        let mut catalog = self.catalog.write();
        match attach_children(&mut catalog, path, children) {
            Ok(outcome) => Ok(outcome.added),
            Err(MergeError::UnknownPath(path)) => Err(DiscoveryError::UnknownCommand(path)),
        }
    }

    async fn probe(
        &self,
        session: &mut DiscoverySession,
        text: &str,
        kind: ProbeKind,
    ) -> Result<FramedResponse> {
        self.framer.begin();
        let line = format!("{text}{}", self.config.scan.line_ending);
        if let Err(err) = self.channel.send(&line).await {
            self.framer.abort();
            return Err(err.into());
        }
        session.probes_sent += 1;
        Ok(self.framer.wait_for_response(kind, text).await)
    }

    /// Writes the catalog. A failure is recorded, not raised.
    fn persist(&self, session: &mut DiscoverySession) {
        let mut snapshot = self.catalog.read().clone();
        match self.store.save(&mut snapshot) {
            Ok(()) => self.catalog.write().last_scanned = snapshot.last_scanned,
            Err(err) => {
                warn!(error = %err, "failed to persist catalog");
                session.warnings.push(
                    ScanWarning::new(WarningKind::PersistFailed, "").with_detail(err.to_string()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn locked_session(shared: &Shared) -> (Arc<tokio::sync::Mutex<()>>, DiscoverySession) {
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        let session = DiscoverySession::new(Arc::clone(&lock).try_lock_owned().unwrap());
        shared.set_state(ScanState::Locked(ScanPhase::ScanningNodes));
        (lock, session)
    }

    #[tokio::test]
    async fn test_state_is_idle_before_lock_is_free() {
        for outcome in [ScanOutcome::Completed, ScanOutcome::Cancelled] {
            let shared = Arc::new(Shared::new());
            let (lock, session) = locked_session(&shared);

            let watcher = {
                let shared = Arc::clone(&shared);
                let lock = Arc::clone(&lock);
                thread::spawn(move || loop {
                    if let Ok(_guard) = lock.try_lock() {
                        return shared.status.borrow().state;
                    }
                    std::hint::spin_loop();
                })
            };
            shared.finish(session, outcome);

            assert_eq!(
                watcher.join().unwrap(),
                ScanState::Idle {
                    last: Some(ScanEnd::from(outcome))
                }
            );
        }
    }

    #[tokio::test]
    async fn test_failed_session_is_idle_before_lock_is_free() {
        let shared = Arc::new(Shared::new());
        let (lock, session) = locked_session(&shared);

        let watcher = {
            let shared = Arc::clone(&shared);
            let lock = Arc::clone(&lock);
            thread::spawn(move || loop {
                if let Ok(_guard) = lock.try_lock() {
                    return shared.status.borrow().state;
                }
                std::hint::spin_loop();
            })
        };
        shared.fail(session, DiscoveryError::ChannelNotOpen);

        assert_eq!(
            watcher.join().unwrap(),
            ScanState::Idle {
                last: Some(ScanEnd::Failed)
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_before_park_ends_session() {
        let shared = Arc::new(Shared::new());
        let (lock, session) = locked_session(&shared);
        let handle = ScanHandle {
            shared: Arc::clone(&shared),
        };
        // Lands after the run loop's cancel check, with nothing parked yet.
        assert!(handle.cancel().is_none());

        let report = shared.park(session);

        assert_eq!(report.outcome, ScanOutcome::Cancelled);
        assert!(shared.parked.lock().is_none());
        assert_eq!(
            shared.status.borrow().state,
            ScanState::Idle {
                last: Some(ScanEnd::Cancelled)
            }
        );
        assert!(lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_park_keeps_lock_and_cancel_collects_it() {
        let shared = Arc::new(Shared::new());
        let (lock, session) = locked_session(&shared);
        let handle = ScanHandle {
            shared: Arc::clone(&shared),
        };

        let report = shared.park(session);
        assert_eq!(report.outcome, ScanOutcome::Paused);
        assert!(handle.is_paused());
        assert!(lock.try_lock().is_err());

        let report = handle.cancel().unwrap();
        assert_eq!(report.outcome, ScanOutcome::Cancelled);
        assert!(lock.try_lock().is_ok());
    }
}
