//! Catalog validation.
//!
//! Checks the structural invariants of a command tree before it is trusted:
//! unique sibling names, `full_path` consistency with the parent chain, and
//! discovery states that agree with the attached children.
//!
//! # Examples
//!
//! ```
//! use shell_catalog_core::*;
//!
//! let mut catalog = Catalog::new();
//! catalog.commands.push(CommandNode::root("log"));
//! assert!(validate_catalog(&catalog).is_empty());
//!
//! // Invalid: duplicate top-level name
//! catalog.commands.push(CommandNode::root("log"));
//! assert!(!validate_catalog(&catalog).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Catalog, CommandNode, DiscoveryState};

/// Catalog validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Node name is empty or whitespace-only.
    #[error("command name cannot be empty (under '{0}')")]
    EmptyCommandName(String),
    /// Two siblings share a name.
    #[error("duplicate command in scope: {0}")]
    DuplicateSibling(String),
    /// A node's `full_path` is not its parent's path plus its own name.
    #[error("full path mismatch: expected '{expected}', found '{found}'")]
    PathMismatch { expected: String, found: String },
    /// A child carries its parent's name.
    #[error("subcommand cycle detected at path: {0}")]
    SelfCycle(String),
    /// `discovery_state` disagrees with the attached children.
    #[error("discovery state {state:?} inconsistent with {children} children at '{path}'")]
    StateMismatch {
        path: String,
        state: DiscoveryState,
        children: usize,
    },
}

/// Validates a whole catalog, collecting every error.
///
/// Within one node the first failed check stops descent into its subtree;
/// siblings and other subtrees are still checked.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationError> {
    validate_siblings(&catalog.commands, &[])
}

/// Validates a single subtree rooted at `node` whose parent path is
/// `parent_path` (empty for a top-level node).
///
/// # Examples
///
/// ```
/// use shell_catalog_core::*;
///
/// let log = CommandNode::root("log");
/// let mut backend = log.child("backend");
/// assert!(validate_node(&backend, &["log".to_string()]).is_empty());
///
/// backend.full_path = vec!["backend".into()];
/// let errors = validate_node(&backend, &["log".to_string()]);
/// assert!(matches!(errors[0], ValidationError::PathMismatch { .. }));
/// ```
pub fn validate_node(node: &CommandNode, parent_path: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let parent_label = parent_path.join(" ");

    if node.name.trim().is_empty() {
        errors.push(ValidationError::EmptyCommandName(parent_label));
        return errors;
    }

    let mut expected = parent_path.to_vec();
    expected.push(node.name.clone());
    if node.full_path != expected {
        errors.push(ValidationError::PathMismatch {
            expected: expected.join(" "),
            found: node.full_path.join(" "),
        });
        return errors;
    }

    if parent_path.last() == Some(&node.name) {
        errors.push(ValidationError::SelfCycle(expected.join(" ")));
        return errors;
    }

    let consistent = match node.discovery_state {
        DiscoveryState::NoChildren => node.children.is_empty(),
        DiscoveryState::HasChildren => !node.children.is_empty(),
        DiscoveryState::Unknown => true,
    };
    if !consistent {
        errors.push(ValidationError::StateMismatch {
            path: expected.join(" "),
            state: node.discovery_state,
            children: node.children.len(),
        });
    }

    errors.extend(validate_siblings(&node.children, &expected));
    errors
}

fn validate_siblings(nodes: &[CommandNode], parent_path: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for node in nodes {
        if !seen.insert(node.name.as_str()) {
            let mut path = parent_path.to_vec();
            path.push(node.name.clone());
            errors.push(ValidationError::DuplicateSibling(path.join(" ")));
            continue;
        }
        errors.extend(validate_node(node, parent_path));
    }

    errors
}
