//! Catalog merge rules.
//!
//! A forced top-level rescan replaces the root list wholesale
//! ([`replace_roots`]). Per-node subcommand discovery is additive only
//! ([`attach_children`], [`merge_own_help`]): existing children and
//! non-empty fields are never overwritten.
//!
//! # Example
//!
//! ```
//! use shell_catalog_core::*;
//!
//! let mut catalog = Catalog::new();
//! replace_roots(&mut catalog, vec![CommandNode::root("log")]);
//!
//! let outcome = attach_children(
//!     &mut catalog,
//!     &["log"],
//!     vec![CommandNode::root("backend"), CommandNode::root("enable")],
//! )
//! .unwrap();
//!
//! assert_eq!(outcome.added.len(), 2);
//! assert_eq!(catalog.node_state(&["log"]), Some(DiscoveryState::HasChildren));
//! assert_eq!(
//!     catalog.find(&["log", "backend"]).unwrap().full_path,
//!     vec!["log", "backend"]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{ArgumentSpec, Catalog, CommandNode, DiscoveryState};

/// Errors raised when a merge targets a node that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("no command at path '{0}'")]
    UnknownPath(String),
}

/// Result of an additive attach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachOutcome {
    /// Full paths of the children that were new, in listing order.
    pub added: Vec<Vec<String>>,
    /// Children skipped because a sibling with the same name already existed.
    pub skipped: usize,
}

/// Replaces the top-level command list.
///
/// Duplicate names keep their first occurrence. Every node is re-rooted so its
/// `full_path` starts at its own name.
pub fn replace_roots(catalog: &mut Catalog, roots: Vec<CommandNode>) {
    let mut seen = HashSet::new();
    catalog.commands = roots
        .into_iter()
        .filter(|node| seen.insert(node.name.clone()))
        .map(|mut node| {
            node.rebase(&[]);
            node
        })
        .collect();
}

/// Attaches `children` under the node at `path`.
///
/// Children whose name is already present (or equals the parent's own name)
/// are skipped. The parent's state becomes `HasChildren` when it ends up with
/// at least one child and `NoChildren` otherwise, so a probed node is never
/// left `Unknown`.
pub fn attach_children<S: AsRef<str>>(
    catalog: &mut Catalog,
    path: &[S],
    children: Vec<CommandNode>,
) -> Result<AttachOutcome, MergeError> {
    let parent = catalog.find_mut(path).ok_or_else(|| {
        MergeError::UnknownPath(
            path.iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(" "),
        )
    })?;

    let mut outcome = AttachOutcome::default();
    let parent_path = parent.full_path.clone();
    let mut seen: HashSet<String> = parent.children.iter().map(|c| c.name.clone()).collect();

    for mut child in children {
        if child.name == parent.name || !seen.insert(child.name.clone()) {
            outcome.skipped += 1;
            continue;
        }
        child.rebase(&parent_path);
        outcome.added.push(child.full_path.clone());
        parent.children.push(child);
    }

    parent.discovery_state = if parent.children.is_empty() {
        DiscoveryState::NoChildren
    } else {
        DiscoveryState::HasChildren
    };

    Ok(outcome)
}

/// Fills empty `description`, `usage` and `arguments` from a node's own help.
///
/// Returns `true` when any field changed.
pub fn merge_own_help(
    node: &mut CommandNode,
    description: Option<&str>,
    usage: Option<&str>,
    arguments: &[ArgumentSpec],
) -> bool {
    let mut changed = false;

    if let Some(desc) = description.filter(|d| !d.is_empty() && node.description.is_empty()) {
        node.description = desc.to_string();
        changed = true;
    }

    if let Some(usage) = usage.filter(|u| !u.is_empty() && node.usage.is_none()) {
        node.usage = Some(usage.to_string());
        changed = true;
    }

    if node.arguments.is_empty() && !arguments.is_empty() {
        node.arguments = arguments.to_vec();
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(names: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        replace_roots(
            &mut catalog,
            names.iter().map(|n| CommandNode::root(n)).collect(),
        );
        catalog
    }

    #[test]
    fn test_replace_roots_is_wholesale() {
        let mut catalog = catalog_with(&["log", "device"]);
        attach_children(&mut catalog, &["log"], vec![CommandNode::root("go")]).unwrap();

        replace_roots(&mut catalog, vec![CommandNode::root("kernel")]);

        assert_eq!(catalog.commands.len(), 1);
        assert_eq!(catalog.commands[0].name, "kernel");
        assert!(catalog.find(&["log"]).is_none());
    }

    #[test]
    fn test_replace_roots_drops_duplicates() {
        let catalog = catalog_with(&["log", "log", "device"]);
        let names: Vec<_> = catalog.commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["log", "device"]);
    }

    #[test]
    fn test_attach_is_additive() {
        let mut catalog = catalog_with(&["log"]);
        attach_children(&mut catalog, &["log"], vec![CommandNode::root("backend")]).unwrap();

        let outcome = attach_children(
            &mut catalog,
            &["log"],
            vec![CommandNode::root("backend"), CommandNode::root("enable")],
        )
        .unwrap();

        assert_eq!(outcome.added, vec![vec!["log".to_string(), "enable".to_string()]]);
        assert_eq!(outcome.skipped, 1);
        let names: Vec<_> = catalog.commands[0]
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["backend", "enable"]);
    }

    #[test]
    fn test_attach_rebases_nested_children() {
        let mut catalog = catalog_with(&["log"]);
        attach_children(&mut catalog, &["log"], vec![CommandNode::root("backend")]).unwrap();
        attach_children(&mut catalog, &["log", "backend"], vec![CommandNode::root("uart")])
            .unwrap();

        let uart = catalog.find(&["log", "backend", "uart"]).unwrap();
        assert_eq!(uart.full_path, vec!["log", "backend", "uart"]);
        assert!(crate::validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn test_attach_empty_marks_leaf() {
        let mut catalog = catalog_with(&["reboot"]);
        let outcome = attach_children(&mut catalog, &["reboot"], Vec::new()).unwrap();

        assert!(outcome.added.is_empty());
        assert_eq!(catalog.node_state(&["reboot"]), Some(DiscoveryState::NoChildren));
    }

    #[test]
    fn test_attach_drops_self_cycle() {
        let mut catalog = catalog_with(&["log"]);
        let outcome =
            attach_children(&mut catalog, &["log"], vec![CommandNode::root("log")]).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(catalog.node_state(&["log"]), Some(DiscoveryState::NoChildren));
    }

    #[test]
    fn test_attach_unknown_path() {
        let mut catalog = catalog_with(&["log"]);
        let err = attach_children(&mut catalog, &["net", "iface"], Vec::new()).unwrap_err();
        assert_eq!(err, MergeError::UnknownPath("net iface".to_string()));
    }

    #[test]
    fn test_merge_own_help_fills_only_empty_fields() {
        let mut node = CommandNode::root("devmem").with_description("Read/write physical memory");
        let args = vec![ArgumentSpec::required("address")];

        let changed = merge_own_help(
            &mut node,
            Some("other text"),
            Some("devmem <address> [<width>]"),
            &args,
        );

        assert!(changed);
        assert_eq!(node.description, "Read/write physical memory");
        assert_eq!(node.usage.as_deref(), Some("devmem <address> [<width>]"));
        assert_eq!(node.arguments, args);

        assert!(!merge_own_help(&mut node, None, Some("x"), &[]));
    }
}
