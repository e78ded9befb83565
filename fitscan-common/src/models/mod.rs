//! Domain records
//!
//! JSON uses camelCase field names, matching the REST API.

pub mod catalog;
pub mod detection;
pub mod inventory;
pub mod invoice;
pub mod session;

pub use catalog::{Dimensions, Part, SizeVariant};
pub use detection::{BoundingBox, Detection, CONFIDENCE_THRESHOLD, DEFAULT_GUIDANCE};
pub use inventory::{InventoryItem, InventoryView};
pub use invoice::{Invoice, InvoiceLineItem};
pub use session::{ScanSession, ScanStatus};
