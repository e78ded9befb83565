//! Business logic between the HTTP layer and the database

pub mod catalog;
pub mod detection_normalizer;
pub mod invoice_generator;
pub mod reference_catalog;
pub mod scan_session;
pub mod upload_store;
pub mod variant_resolver;
pub mod vision;
