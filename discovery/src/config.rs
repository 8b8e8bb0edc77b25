//! Discovery configuration.
//!
//! Every threshold the framer and orchestrator rely on lives here as a named,
//! tunable value. The defaults were calibrated against a Zephyr shell over a
//! raw TCP bridge; slower links want longer timeouts.
//!
//! # Example YAML
//!
//! ```yaml
//! framer:
//!   poll_interval_ms: 50
//!   stability_polls: 3
//!   top_level_timeout_ms: 5000
//!   subcommand_timeout_ms: 2000
//! scan:
//!   inter_probe_delay_ms: 100
//!   long_scan_threshold_secs: 120
//!   skip_commands:
//!     - help
//!   line_ending: "\n"
//! prompt_pattern: '(?:[A-Za-z0-9_.@-]+:[^\s$#>]*)?[$#>]'
//! ```
//!
//! Missing keys fall back to their defaults, so an empty file is valid.

use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::framer::ProbeKind;
use crate::prompt::{DEFAULT_PROMPT_PATTERN, PromptMatcher};

/// Response framing thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramerConfig {
    /// Delay between buffer polls.
    pub poll_interval_ms: u64,
    /// Consecutive unchanged polls that count as a complete response.
    pub stability_polls: u32,
    /// Hard bound for the initial `help` probe.
    pub top_level_timeout_ms: u64,
    /// Hard bound for each `<path> --help` probe.
    pub subcommand_timeout_ms: u64,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            stability_polls: 3,
            top_level_timeout_ms: 5000,
            subcommand_timeout_ms: 2000,
        }
    }
}

impl FramerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Hard bound for a probe of the given kind.
    pub fn timeout(&self, kind: ProbeKind) -> Duration {
        match kind {
            ProbeKind::TopLevel => Duration::from_millis(self.top_level_timeout_ms),
            ProbeKind::Subcommand => Duration::from_millis(self.subcommand_timeout_ms),
        }
    }
}

/// Walk pacing and governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Cooperative delay between probes.
    pub inter_probe_delay_ms: u64,
    /// Elapsed time after which a scan with work left pauses for
    /// confirmation. `0` disables the check.
    pub long_scan_threshold_secs: u64,
    /// Node names that are marked as leaves without being probed.
    pub skip_commands: Vec<String>,
    /// Appended to every probe.
    pub line_ending: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            inter_probe_delay_ms: 100,
            long_scan_threshold_secs: 120,
            skip_commands: vec!["help".to_string()],
            line_ending: "\n".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn inter_probe_delay(&self) -> Duration {
        Duration::from_millis(self.inter_probe_delay_ms)
    }

    pub fn long_scan_threshold(&self) -> Option<Duration> {
        (self.long_scan_threshold_secs > 0)
            .then(|| Duration::from_secs(self.long_scan_threshold_secs))
    }

    pub fn should_skip(&self, name: &str) -> bool {
        self.skip_commands.iter().any(|c| c == name)
    }
}

/// Top-level discovery configuration.
///
/// # Examples
///
/// ```
/// use shell_catalog_discovery::DiscoveryConfig;
///
/// let config: DiscoveryConfig = serde_yaml::from_str("scan: { inter_probe_delay_ms: 0 }").unwrap();
/// assert_eq!(config.scan.inter_probe_delay_ms, 0);
/// assert_eq!(config.framer.stability_polls, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub framer: FramerConfig,
    pub scan: ScanConfig,
    /// Regex for one shell prompt token, without anchors.
    pub prompt_pattern: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            framer: FramerConfig::default(),
            scan: ScanConfig::default(),
            prompt_pattern: DEFAULT_PROMPT_PATTERN.to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read, or
    /// [`ConfigError::YamlError`] if parsing fails. The result is not
    /// validated; call [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Rejects values the framer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let framer = &self.framer;
        if framer.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "framer.poll_interval_ms must be positive".to_string(),
            ));
        }
        if framer.stability_polls == 0 {
            return Err(ConfigError::Invalid(
                "framer.stability_polls must be positive".to_string(),
            ));
        }
        for (name, timeout) in [
            ("top_level_timeout_ms", framer.top_level_timeout_ms),
            ("subcommand_timeout_ms", framer.subcommand_timeout_ms),
        ] {
            if timeout < framer.poll_interval_ms {
                return Err(ConfigError::Invalid(format!(
                    "framer.{name} ({timeout}) is shorter than one poll ({})",
                    framer.poll_interval_ms
                )));
            }
        }
        self.prompt_matcher()?;
        Ok(())
    }

    /// Compiles [`prompt_pattern`](Self::prompt_pattern).
    pub fn prompt_matcher(&self) -> Result<PromptMatcher, ConfigError> {
        Ok(PromptMatcher::new(&self.prompt_pattern)?)
    }
}
