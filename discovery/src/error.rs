//! Error types for shell discovery.
//!
//! Only conditions that end a scan are errors. Recoverable per-node problems
//! (timeouts, ambiguous listings, failed persists) are reported as
//! [`ScanWarning`](crate::report::ScanWarning)s instead.

use thiserror::Error;

/// Errors raised by a [`ChannelAdapter`](crate::channel::ChannelAdapter).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel is not connected.
    #[error("channel is not open")]
    NotOpen,

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Fatal discovery errors. The discovery lock is always released before one
/// of these is returned.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A probe was attempted without a live channel.
    #[error("channel is not open")]
    ChannelNotOpen,

    /// The top-level probe produced no parseable commands. The catalog is
    /// left untouched.
    #[error("no commands found in top-level help output")]
    NoCommandsFound,

    /// Another scan holds the discovery lock.
    #[error("a discovery scan is already in progress")]
    ConcurrentScanRejected,

    /// `resume` was called without a paused scan.
    #[error("no paused scan to resume")]
    NotPaused,

    /// On-demand discovery of a path that is not in the catalog.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Transport failure while sending a probe.
    #[error("channel error: {0}")]
    Channel(ChannelError),
}

impl From<ChannelError> for DiscoveryError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::NotOpen => Self::ChannelNotOpen,
            other => Self::Channel(other),
        }
    }
}

/// Errors raised while loading or validating a [`DiscoveryConfig`](crate::DiscoveryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The prompt pattern does not compile.
    #[error("invalid prompt pattern: {0}")]
    InvalidPrompt(#[from] regex::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Convenience alias for results with [`DiscoveryError`].
pub type Result<T> = std::result::Result<T, DiscoveryError>;
