//! Detection records produced from one uploaded image

use serde::{Deserialize, Serialize};

/// Minimum confidence for a detection to count as recognized
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Guidance attached to unrecognized detections when the vision step gave none
pub const DEFAULT_GUIDANCE: &str = "retake";

/// Axis-aligned box in source-image pixel units, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// One candidate physical part found within one image
///
/// `recognized == true` implies `part_id` is set and
/// `confidence >= CONFIDENCE_THRESHOLD`; unrecognized detections carry `guidance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub detection_id: String,
    pub image_index: usize,
    pub bounding_box: BoundingBox,
    pub recognized: bool,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_variant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl Detection {
    /// (part, variant) key when this detection can be billed
    pub fn billable_key(&self) -> Option<(&str, &str)> {
        if !self.recognized {
            return None;
        }
        match (self.part_id.as_deref(), self.size_variant_id.as_deref()) {
            (Some(part), Some(variant)) if !part.is_empty() && !variant.is_empty() => {
                Some((part, variant))
            }
            _ => None,
        }
    }
}
