//! Scan session records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Detection;

/// Review lifecycle of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Freshly analyzed, awaiting review
    Draft,
    /// Reviewed by a user
    Resolved,
    /// An invoice was generated from this session
    ConvertedToInvoice,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Draft => "draft",
            ScanStatus::Resolved => "resolved",
            ScanStatus::ConvertedToInvoice => "converted_to_invoice",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ScanStatus::Draft),
            "resolved" => Ok(ScanStatus::Resolved),
            "converted_to_invoice" => Ok(ScanStatus::ConvertedToInvoice),
            other => Err(crate::Error::InvalidInput(format!("Unknown scan status: {}", other))),
        }
    }
}

/// One upload batch and its detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    pub session_id: String,
    pub image_urls: Vec<String>,
    pub detections: Vec<Detection>,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
