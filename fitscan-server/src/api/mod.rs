//! HTTP API handlers
//!
//! Every resource module exposes a `*_routes()` function returning a
//! `Router<AppState>`; `build_router` merges them.

pub mod health;
pub mod inventory;
pub mod invoices;
pub mod parts;
pub mod reference_catalog;
pub mod scan;

pub use health::health_routes;
pub use inventory::inventory_routes;
pub use invoices::invoice_routes;
pub use parts::part_routes;
pub use reference_catalog::reference_catalog_routes;
pub use scan::scan_routes;
