//! Database access for fitscan-server
//!
//! Single-statement reads and writes are generic over the sqlx executor so
//! they run against the pool or inside a transaction; multi-statement
//! operations take a `&mut SqliteConnection`.

pub mod inventory;
pub mod invoices;
pub mod parts;
pub mod sessions;

use fitscan_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a JSON column
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", what, e)))
}

/// Decode a JSON column
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", what, e)))
}
