//! Core command-tree types for a remote shell catalog.
//!
//! This crate defines the data model shared by discovery, storage and
//! presentation:
//!
//! - [`CommandNode`]: one entry in the discovered command tree (name, full
//!   path, description, usage, arguments, children, discovery state).
//! - [`ArgumentSpec`]: a positional argument, required or optional.
//! - [`DiscoveryState`]: whether a node has been probed and what was found.
//! - [`Catalog`]: the versioned, ordered list of top-level commands.
//!
//! Validation ([`validate_catalog`], [`validate_node`]) checks sibling
//! uniqueness and `full_path` consistency. Merging ([`replace_roots`],
//! [`attach_children`], [`merge_own_help`]) implements the catalog update
//! rules: wholesale replacement of the roots, additive attachment below them.
//!
//! # Example
//!
//! ```
//! use shell_catalog_core::*;
//!
//! let mut catalog = Catalog::new();
//! replace_roots(
//!     &mut catalog,
//!     vec![
//!         CommandNode::root("log").with_description("Logging commands"),
//!         CommandNode::root("devmem")
//!             .with_usage("devmem <address> [<width>]")
//!             .with_argument(ArgumentSpec::required("address"))
//!             .with_argument(ArgumentSpec::optional("width")),
//!     ],
//! );
//! attach_children(&mut catalog, &["log"], vec![CommandNode::root("backend")]).unwrap();
//!
//! assert_eq!(catalog.find(&["log", "backend"]).unwrap().execution_string(), "log backend");
//! assert_eq!(catalog.pending_paths().len(), 2);
//! assert!(validate_catalog(&catalog).is_empty());
//! ```

mod catalog;
mod merge;
mod types;
mod validate;

pub use catalog::{Catalog, CatalogVersion};
pub use merge::{AttachOutcome, MergeError, attach_children, merge_own_help, replace_roots};
pub use types::*;
pub use validate::{ValidationError, validate_catalog, validate_node};
