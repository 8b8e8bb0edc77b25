use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CommandNode, DiscoveryState};

/// Typed catalog format version.
///
/// Persisted as a string (`"1.0"`, `"2.0"`). Only [`CatalogVersion::CURRENT`]
/// is ever trusted on load; see the store crate's migration table.
///
/// # Examples
///
/// ```
/// use shell_catalog_core::CatalogVersion;
///
/// assert_eq!(CatalogVersion::parse("2.0"), Some(CatalogVersion::Tree));
/// assert_eq!(CatalogVersion::parse("1.0"), Some(CatalogVersion::LegacyFlat));
/// assert_eq!(CatalogVersion::parse("9.9"), None);
/// assert_eq!(CatalogVersion::CURRENT.as_str(), "2.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CatalogVersion {
    /// Flat command list without children. Never upgraded.
    LegacyFlat,
    /// Tree with children and per-node discovery state.
    Tree,
}

impl CatalogVersion {
    /// The version written by this build.
    pub const CURRENT: CatalogVersion = CatalogVersion::Tree;

    /// All known versions, oldest first.
    pub const ALL: [CatalogVersion; 2] = [CatalogVersion::LegacyFlat, CatalogVersion::Tree];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyFlat => "1.0",
            Self::Tree => "2.0",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == raw.trim())
    }
}

impl fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CatalogVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown catalog version: {value}"))
    }
}

impl From<CatalogVersion> for String {
    fn from(value: CatalogVersion) -> Self {
        value.as_str().to_string()
    }
}

/// The full command tree plus version metadata.
///
/// Serializes to the persisted record
/// `{ version, lastScanned, commands }`.
///
/// # Examples
///
/// ```
/// use shell_catalog_core::*;
///
/// let mut catalog = Catalog::new();
/// catalog.commands.push(CommandNode::root("log"));
/// catalog.commands.push(CommandNode::root("device"));
///
/// assert_eq!(catalog.version, CatalogVersion::CURRENT);
/// assert!(catalog.find(&["log"]).is_some());
/// assert_eq!(catalog.node_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub version: CatalogVersion,
    /// ISO-8601 timestamp of the last persist; empty before the first save.
    #[serde(default)]
    pub last_scanned: String,
    /// Top-level commands in listing order.
    pub commands: Vec<CommandNode>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Creates an empty catalog at the current version.
    pub fn new() -> Self {
        Self {
            version: CatalogVersion::CURRENT,
            last_scanned: String::new(),
            commands: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Resolves a node by its full path, walking down from its top-level
    /// ancestor.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.commands.iter().find(|c| c.name == first.as_ref())?;
        for segment in rest {
            node = node.find_child(segment.as_ref())?;
        }
        Some(node)
    }

    /// Mutable variant of [`find`](Self::find).
    pub fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut CommandNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self
            .commands
            .iter_mut()
            .find(|c| c.name == first.as_ref())?;
        for segment in rest {
            node = node.find_child_mut(segment.as_ref())?;
        }
        Some(node)
    }

    /// Discovery state of the node at `path`, if present.
    pub fn node_state<S: AsRef<str>>(&self, path: &[S]) -> Option<DiscoveryState> {
        self.find(path).map(|n| n.discovery_state)
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.commands.iter().map(CommandNode::subtree_len).sum()
    }

    /// Depth-first, pre-order traversal of every node.
    pub fn walk(&self) -> Vec<&CommandNode> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack: Vec<&CommandNode> = self.commands.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Returns paths of nodes that still need a probe, in walk order.
    pub fn pending_paths(&self) -> Vec<Vec<String>> {
        self.walk()
            .into_iter()
            .filter(|n| !n.is_probe_redundant())
            .map(|n| n.full_path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        let mut log = CommandNode::root("log");
        let mut backend = log.child("backend");
        backend.children.push(backend.child("uart"));
        backend.discovery_state = DiscoveryState::HasChildren;
        log.children.push(backend);
        log.children.push(log.child("go").with_state(DiscoveryState::NoChildren));
        log.discovery_state = DiscoveryState::HasChildren;
        catalog.commands.push(log);
        catalog.commands.push(CommandNode::root("device"));
        catalog
    }

    #[test]
    fn test_find_resolves_nested_paths() {
        let catalog = sample();
        let uart = catalog.find(&["log", "backend", "uart"]).unwrap();
        assert_eq!(uart.full_path, vec!["log", "backend", "uart"]);
        assert!(catalog.find(&["log", "missing"]).is_none());
        assert!(catalog.find::<&str>(&[]).is_none());
    }

    #[test]
    fn test_walk_is_preorder() {
        let catalog = sample();
        let names: Vec<String> = catalog.walk().iter().map(|n| n.execution_string()).collect();
        assert_eq!(
            names,
            vec!["log", "log backend", "log backend uart", "log go", "device"]
        );
    }

    #[test]
    fn test_pending_paths_skips_settled_and_populated() {
        let catalog = sample();
        assert_eq!(
            catalog.pending_paths(),
            vec![
                vec!["log".to_string(), "backend".into(), "uart".into()],
                vec!["device".to_string()],
            ]
        );
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_value(Catalog::new()).unwrap();
        assert_eq!(json["version"], "2.0");
        assert_eq!(json["lastScanned"], "");
        assert!(json["commands"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_version_fails_deserialization() {
        let raw = r#"{"version":"7.0","lastScanned":"","commands":[]}"#;
        assert!(serde_json::from_str::<Catalog>(raw).is_err());
    }
}
