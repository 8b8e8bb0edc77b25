//! Versioned persistence for discovered shell command catalogs.
//!
//! The persisted record is `{ version, lastScanned, commands }` as JSON. A
//! record is trusted only when its version is current (see
//! [`MIGRATIONS`]) and the tree passes structural validation; anything else
//! is a [`CacheMiss`] and the caller falls back to a fresh scan.
//!
//! # Quick start
//!
//! ```no_run
//! use shell_catalog_core::{Catalog, CommandNode};
//! use shell_catalog_store::{CatalogStore, FileCatalogStore};
//!
//! let store = FileCatalogStore::new("catalog.json");
//!
//! let mut catalog = store.load().unwrap_or_default();
//! catalog.commands.push(CommandNode::root("kernel"));
//! store.save(&mut catalog).unwrap();
//!
//! match store.load_with_reason() {
//!     Ok(catalog) => println!("{} commands cached", catalog.node_count()),
//!     Err(miss) => println!("no cache: {miss}"),
//! }
//! ```

mod codec;
mod error;
mod migration;
mod store;

pub use codec::{CacheMiss, encode, load, load_with_reason, save};
pub use error::{Result, StoreError};
pub use migration::{MIGRATIONS, Migration, migration_for};
pub use store::{CatalogStore, FileCatalogStore, MemoryCatalogStore};
