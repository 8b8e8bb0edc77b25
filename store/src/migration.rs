//! Version migration table.
//!
//! Every known [`CatalogVersion`] maps to exactly one [`Migration`]. Today the
//! table is trivial: the current version is trusted as-is and anything older
//! is discarded, which forces a rescan. There is no field-by-field upgrade
//! path.

use shell_catalog_core::CatalogVersion;

/// What to do with a persisted catalog of a given version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// Trust the record and deserialize it.
    Current,
    /// Throw the record away.
    Discard,
}

/// The migration table, oldest version first.
pub const MIGRATIONS: [(CatalogVersion, Migration); 2] = [
    (CatalogVersion::LegacyFlat, Migration::Discard),
    (CatalogVersion::Tree, Migration::Current),
];

/// Looks up the migration rule for `version`.
///
/// # Examples
///
/// ```
/// use shell_catalog_core::CatalogVersion;
/// use shell_catalog_store::{Migration, migration_for};
///
/// assert_eq!(migration_for(CatalogVersion::CURRENT), Migration::Current);
/// assert_eq!(migration_for(CatalogVersion::LegacyFlat), Migration::Discard);
/// ```
pub fn migration_for(version: CatalogVersion) -> Migration {
    MIGRATIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, m)| *m)
        .unwrap_or(Migration::Discard)
}
