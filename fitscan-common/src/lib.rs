//! # fitscan common library
//!
//! Shared code for the fitscan service and its tests:
//! - Domain records (parts, detections, scan sessions, inventory, invoices)
//! - Database initialization and schema
//! - Configuration loading and root folder resolution
//! - Identifier, money and timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod models;
pub mod money;
pub mod time;

pub use error::{Error, Result};
