//! Byte-level catalog codec.
//!
//! [`load`] never returns a partially trusted tree: the raw `version` field is
//! checked against the migration table before the record is deserialized, and
//! the deserialized tree must pass structural validation.

use std::fmt;

use serde_json::Value;
use shell_catalog_core::{Catalog, CatalogVersion, ValidationError, validate_catalog};
use tracing::debug;

use crate::error::Result;
use crate::migration::{Migration, migration_for};

/// Why a persisted catalog was not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMiss {
    /// Nothing has been persisted yet.
    Absent,
    /// The backing storage could not be read.
    Unreadable(String),
    /// The bytes are not a catalog record.
    Malformed(String),
    /// The `version` tag is not one this build knows.
    UnknownVersion(String),
    /// A known but non-current version; discarded by the migration table.
    VersionMismatch { found: CatalogVersion },
    /// The tree violates structural invariants; every violation found.
    Invalid(Vec<ValidationError>),
}

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "no catalog persisted"),
            Self::Unreadable(err) => write!(f, "catalog unreadable: {err}"),
            Self::Malformed(err) => write!(f, "malformed catalog: {err}"),
            Self::UnknownVersion(raw) => write!(f, "unknown catalog version '{raw}'"),
            Self::VersionMismatch { found } => write!(
                f,
                "catalog version {found} does not match current {}",
                CatalogVersion::CURRENT
            ),
            Self::Invalid(errors) => {
                write!(f, "invalid catalog: {} structural error(s)", errors.len())?;
                for err in errors {
                    write!(f, "\n  {err}")?;
                }
                Ok(())
            }
        }
    }
}

/// Decodes a catalog, collapsing every miss into `None`.
///
/// # Examples
///
/// ```
/// use shell_catalog_store::load;
///
/// let raw = br#"{"version":"2.0","lastScanned":"","commands":[
///     {"name":"log","fullPath":["log"],"discoveryState":"unknown"}
/// ]}"#;
/// assert_eq!(load(raw).unwrap().commands[0].name, "log");
///
/// let legacy = br#"{"version":"1.0","commands":[{"name":"log"}]}"#;
/// assert!(load(legacy).is_none());
/// ```
pub fn load(bytes: &[u8]) -> Option<Catalog> {
    match load_with_reason(bytes) {
        Ok(catalog) => Some(catalog),
        Err(miss) => {
            debug!(reason = %miss, "discarding persisted catalog");
            None
        }
    }
}

/// Decodes a catalog, reporting why it was rejected.
pub fn load_with_reason(bytes: &[u8]) -> std::result::Result<Catalog, CacheMiss> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CacheMiss::Absent);
    }

    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| CacheMiss::Malformed(e.to_string()))?;

    let raw_version = value
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| CacheMiss::Malformed("missing string field 'version'".to_string()))?;
    let version = CatalogVersion::parse(raw_version)
        .ok_or_else(|| CacheMiss::UnknownVersion(raw_version.to_string()))?;

    if migration_for(version) == Migration::Discard {
        return Err(CacheMiss::VersionMismatch { found: version });
    }

    let catalog: Catalog =
        serde_json::from_value(value).map_err(|e| CacheMiss::Malformed(e.to_string()))?;

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        return Err(CacheMiss::Invalid(errors));
    }

    Ok(catalog)
}

/// Stamps `last_scanned` with the current UTC time and encodes the catalog.
pub fn save(catalog: &mut Catalog) -> Result<Vec<u8>> {
    catalog.last_scanned = chrono::Utc::now().to_rfc3339();
    encode(catalog)
}

/// Encodes the catalog as pretty JSON without touching `last_scanned`.
pub fn encode(catalog: &Catalog) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(catalog)?)
}
