//! Identifier generation
//!
//! External keys use a short prefix plus the first 8 hex digits of a UUIDv4;
//! detection and size variant ids are full UUID strings.

use uuid::Uuid;

fn short(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..8])
}

/// New part id, used when a client creates a part without one
pub fn part_id() -> String {
    short("part")
}

/// New scan session id
pub fn session_id() -> String {
    short("scan")
}

/// New invoice id
pub fn invoice_id() -> String {
    short("inv")
}

/// New size variant id
pub fn variant_id() -> String {
    Uuid::new_v4().to_string()
}

/// New detection id
pub fn detection_id() -> String {
    Uuid::new_v4().to_string()
}
