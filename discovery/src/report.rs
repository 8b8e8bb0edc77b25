//! Structured scan reporting.

use serde::{Deserialize, Serialize};

/// Recoverable per-node problems recorded during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The probe hit its hard bound and nothing usable was captured.
    ProbeTimeout,
    /// A section marker was found but no command lines matched.
    ParseAmbiguity,
    /// The shell answered with the parent's listing.
    ParentEcho,
    /// Writing the catalog failed; the scan kept going.
    PersistFailed,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProbeTimeout => write!(f, "probe_timeout"),
            Self::ParseAmbiguity => write!(f, "parse_ambiguity"),
            Self::ParentEcho => write!(f, "parent_echo"),
            Self::PersistFailed => write!(f, "persist_failed"),
        }
    }
}

/// One recorded warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub kind: WarningKind,
    /// Execution string of the node concerned, empty for catalog-wide issues.
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ScanWarning {
    pub fn new(kind: WarningKind, command: impl Into<String>) -> Self {
        Self {
            kind,
            command: command.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.command.is_empty() {
            write!(f, " [{}]", self.command)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// How a scan call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The worklist drained.
    Completed,
    /// Cancellation was observed at a probe boundary.
    Cancelled,
    /// The walk parked for confirmation. Call `resume` or `cancel`.
    Paused,
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// `current` probes done out of an estimated `total`.
///
/// `total` is `current` plus the remaining worklist, so it grows as children
/// are found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Summary of one scan call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    /// Probes written to the channel, the top-level probe included.
    pub probes_sent: usize,
    /// Nodes newly attached to the catalog.
    pub nodes_attached: usize,
    /// Worklist entries skipped as already discovered.
    pub skipped: usize,
    pub elapsed_ms: u64,
    pub progress: Progress,
    pub warnings: Vec<ScanWarning>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == ScanOutcome::Completed
    }

    /// Warnings of one kind.
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &ScanWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}
