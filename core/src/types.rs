//! Command tree type definitions.
//!
//! This module defines the data model for a discovered shell command tree.
//! The types serialize with [`serde`] using the camelCase field names of the
//! persisted catalog record (`fullPath`, `discoveryState`, ...).

use serde::{Deserialize, Serialize};

/// Probe state of a single command node.
///
/// Drives UI affordances: `Unknown` nodes may still expand (spinner while
/// probing), `HasChildren` nodes show an expand arrow, `NoChildren` nodes are
/// leaves and are never probed again.
///
/// # Examples
///
/// ```
/// use shell_catalog_core::DiscoveryState;
///
/// assert_eq!(DiscoveryState::default(), DiscoveryState::Unknown);
/// assert!(DiscoveryState::NoChildren.is_settled());
/// assert!(!DiscoveryState::Unknown.is_settled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DiscoveryState {
    /// Not probed yet.
    #[default]
    Unknown,
    /// Probed; the shell listed no subcommands.
    NoChildren,
    /// Probed; subcommands were attached.
    HasChildren,
}

impl DiscoveryState {
    /// Returns `true` once a probe has classified the node.
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Value type of an argument.
///
/// Help text carries no type information beyond required/optional, so every
/// argument is a string today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ArgumentType {
    #[default]
    String,
}

/// Schema for one positional argument of a command.
///
/// # Examples
///
/// ```
/// use shell_catalog_core::ArgumentSpec;
///
/// let address = ArgumentSpec::required("address");
/// assert!(address.required);
///
/// let width = ArgumentSpec::optional("width").with_description("access width");
/// assert!(!width.required);
/// assert_eq!(width.description.as_deref(), Some("access width"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Cleaned token text (e.g. `address` for `<address>`).
    pub name: String,
    /// `true` for `<name>`, `false` for `[<name>]` / `[name]`.
    pub required: bool,
    /// Value type; always [`ArgumentType::String`].
    #[serde(rename = "type", default)]
    pub value_type: ArgumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArgumentSpec {
    /// Creates a required argument.
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            value_type: ArgumentType::String,
            description: None,
        }
    }

    /// Creates an optional argument.
    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
            value_type: ArgumentType::String,
            description: None,
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }
}

/// One entry in the discovered command tree.
///
/// `full_path` is the ordered list of names from the root; joining it with
/// spaces gives the string to type into the shell. Children stay empty until
/// the node has been probed.
///
/// # Examples
///
/// ```
/// use shell_catalog_core::{CommandNode, DiscoveryState};
///
/// let log = CommandNode::root("log").with_description("Logging commands");
/// let backend = log.child("backend");
///
/// assert_eq!(backend.full_path, vec!["log", "backend"]);
/// assert_eq!(backend.execution_string(), "log backend");
/// assert_eq!(backend.discovery_state, DiscoveryState::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandNode {
    /// Local segment name.
    pub name: String,
    /// Names from the root down to and including this node.
    pub full_path: Vec<String>,
    /// Joined free-text description; empty when the shell gave none.
    #[serde(default)]
    pub description: String,
    /// Raw usage text, joined into one string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Positional arguments in first-seen order.
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
    /// Subcommands in listing order.
    #[serde(default)]
    pub children: Vec<CommandNode>,
    #[serde(default)]
    pub discovery_state: DiscoveryState,
}

impl CommandNode {
    /// Creates a top-level node.
    pub fn root(name: &str) -> Self {
        Self::at_path(vec![name.to_string()])
    }

    /// Creates a node at an explicit path. The last segment becomes the name.
    pub fn at_path(full_path: Vec<String>) -> Self {
        let name = full_path.last().cloned().unwrap_or_default();
        Self {
            name,
            full_path,
            description: String::new(),
            usage: None,
            arguments: Vec::new(),
            children: Vec::new(),
            discovery_state: DiscoveryState::Unknown,
        }
    }

    /// Creates a (detached) child node whose path extends this node's path.
    pub fn child(&self, name: &str) -> Self {
        let mut path = self.full_path.clone();
        path.push(name.to_string());
        Self::at_path(path)
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Adds a usage string.
    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = Some(usage.to_string());
        self
    }

    /// Adds an argument.
    pub fn with_argument(mut self, arg: ArgumentSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Sets the discovery state.
    pub fn with_state(mut self, state: DiscoveryState) -> Self {
        self.discovery_state = state;
        self
    }

    /// The string to send to the shell to run this command.
    pub fn execution_string(&self) -> String {
        self.full_path.join(" ")
    }

    /// Finds a direct child by name.
    pub fn find_child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable variant of [`find_child`](Self::find_child).
    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut CommandNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Returns `true` when a probe of this node would be redundant.
    ///
    /// Settled leaves and nodes that already carry children are skipped by the
    /// discovery walk.
    pub fn is_probe_redundant(&self) -> bool {
        self.discovery_state == DiscoveryState::NoChildren || !self.children.is_empty()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(CommandNode::subtree_len).sum::<usize>()
    }

    /// Re-roots this subtree so every `full_path` extends `parent_path`.
    pub(crate) fn rebase(&mut self, parent_path: &[String]) {
        let mut path = parent_path.to_vec();
        path.push(self.name.clone());
        self.full_path = path;
        let own = self.full_path.clone();
        for child in &mut self.children {
            child.rebase(&own);
        }
    }
}
