//! Detection normalization
//!
//! Turns one image's raw vision output into canonical [`Detection`] records.
//! The raw schema is strict but every field is optional; a payload that does
//! not match it yields an empty list for that image instead of failing the batch.

use fitscan_common::ids;
use fitscan_common::models::{BoundingBox, Detection, CONFIDENCE_THRESHOLD, DEFAULT_GUIDANCE};
use serde::{Deserialize, Serialize};

/// Grid used to place detections that arrive without geometry
const GRID_COLUMNS: u32 = 3;
const GRID_ROWS: u32 = 4;

/// Pixel size of the analyzed image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Units of a raw bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxUnit {
    #[default]
    Px,
    /// 0-100 of image width/height
    Percent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBoundingBox {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub w: Option<f64>,
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub unit: BoxUnit,
}

/// One entry as returned by a vision provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub guidance: Option<String>,
    #[serde(default, alias = "boundingBox")]
    pub bbox: Option<RawBoundingBox>,
}

/// Accepted top-level shapes: a bare array or `{"detections": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVisionPayload {
    Bare(Vec<RawDetection>),
    Wrapped {
        #[serde(default)]
        detections: Option<Vec<RawDetection>>,
    },
}

/// Decode a provider payload
pub fn parse_payload(content: &str) -> Result<Vec<RawDetection>, serde_json::Error> {
    let payload: RawVisionPayload = serde_json::from_str(content)?;
    Ok(match payload {
        RawVisionPayload::Bare(list) => list,
        RawVisionPayload::Wrapped { detections } => detections.unwrap_or_default(),
    })
}

/// Decode and normalize; malformed content yields no detections
pub fn normalize_content(content: &str, dims: ImageDimensions, image_index: usize) -> Vec<Detection> {
    match parse_payload(content) {
        Ok(raw) => normalize(&raw, dims, image_index),
        Err(e) => {
            tracing::warn!(
                image_index,
                error = %e,
                "Vision payload did not match the detection schema, image skipped"
            );
            Vec::new()
        }
    }
}

/// Normalize decoded raw entries for one image
///
/// Recognized detections carry the raw part id as a placeholder
/// `size_variant_id`; variant resolution replaces it with a real key.
pub fn normalize(raw: &[RawDetection], dims: ImageDimensions, image_index: usize) -> Vec<Detection> {
    raw.iter()
        .enumerate()
        .map(|(index, entry)| normalize_one(entry, index, dims, image_index))
        .collect()
}

fn normalize_one(
    entry: &RawDetection,
    index: usize,
    dims: ImageDimensions,
    image_index: usize,
) -> Detection {
    let part_id = entry
        .part_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let recognized = part_id.is_some() && is_confident(entry.confidence);

    let (part_id, size_variant_id, guidance) = if recognized {
        let part = part_id.map(str::to_string);
        (part.clone(), part, None)
    } else {
        let guidance = entry
            .guidance
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_GUIDANCE)
            .to_string();
        (None, None, Some(guidance))
    };

    Detection {
        detection_id: ids::detection_id(),
        image_index,
        bounding_box: resolve_box(entry.bbox.as_ref(), index, dims),
        recognized,
        confidence: clamp_confidence(entry.confidence),
        part_id,
        size_variant_id,
        guidance,
    }
}

fn is_confident(confidence: Option<f64>) -> bool {
    confidence.map_or(false, |c| c >= CONFIDENCE_THRESHOLD)
}

fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn resolve_box(raw: Option<&RawBoundingBox>, index: usize, dims: ImageDimensions) -> BoundingBox {
    let Some(b) = raw else {
        return grid_box(index, dims);
    };
    match (b.x, b.y, b.w, b.h) {
        (Some(x), Some(y), Some(w), Some(h)) => match b.unit {
            BoxUnit::Px => BoundingBox { x, y, w, h },
            BoxUnit::Percent => {
                let sx = f64::from(dims.width) / 100.0;
                let sy = f64::from(dims.height) / 100.0;
                BoundingBox {
                    x: x * sx,
                    y: y * sy,
                    w: w * sx,
                    h: h * sy,
                }
            }
        },
        _ => grid_box(index, dims),
    }
}

/// Deterministic placement for the `index`-th detection without geometry:
/// column `index mod 3`, row `index div 3` of a 3×4 grid over the image
pub fn grid_box(index: usize, dims: ImageDimensions) -> BoundingBox {
    let w = dims.width / GRID_COLUMNS;
    let h = dims.height / GRID_ROWS;
    let col = (index % GRID_COLUMNS as usize) as f64;
    let row = (index / GRID_COLUMNS as usize) as f64;
    BoundingBox {
        x: col * f64::from(w),
        y: row * f64::from(h),
        w: f64::from(w),
        h: f64::from(h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: ImageDimensions = ImageDimensions {
        width: 800,
        height: 600,
    };

    fn raw(part_id: Option<&str>, confidence: f64) -> RawDetection {
        RawDetection {
            part_id: part_id.map(str::to_string),
            confidence: Some(confidence),
            ..Default::default()
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let out = normalize(&[raw(Some("100A"), 0.7), raw(Some("100A"), 0.699999)], DIMS, 0);
        assert!(out[0].recognized);
        assert!(!out[1].recognized);
    }

    #[test]
    fn test_high_confidence_without_part_is_not_recognized() {
        let out = normalize(&[raw(None, 0.99), raw(Some("  "), 0.99)], DIMS, 0);
        assert!(out.iter().all(|d| !d.recognized));
        assert!(out.iter().all(|d| d.part_id.is_none()));
    }

    #[test]
    fn test_recognized_carries_placeholder_variant() {
        let out = normalize(&[raw(Some("200B"), 0.9)], DIMS, 2);
        let d = &out[0];
        assert_eq!(d.part_id.as_deref(), Some("200B"));
        assert_eq!(d.size_variant_id.as_deref(), Some("200B"));
        assert_eq!(d.image_index, 2);
        assert!(d.guidance.is_none());
    }

    #[test]
    fn test_unrecognized_gets_guidance() {
        let mut rotate = raw(Some("200B"), 0.4);
        rotate.guidance = Some("rotate".to_string());
        let out = normalize(&[rotate, raw(None, 0.2)], DIMS, 0);

        assert_eq!(out[0].guidance.as_deref(), Some("rotate"));
        assert!(out[0].part_id.is_none());
        assert!(out[0].size_variant_id.is_none());
        assert_eq!(out[1].guidance.as_deref(), Some(DEFAULT_GUIDANCE));
    }

    #[test]
    fn test_confidence_clamped() {
        let mut missing = raw(None, 0.0);
        missing.confidence = None;
        let out = normalize(&[raw(Some("A"), 1.7), raw(None, -0.3), missing], DIMS, 0);
        assert_eq!(out[0].confidence, 1.0);
        assert!(out[0].recognized);
        assert_eq!(out[1].confidence, 0.0);
        assert_eq!(out[2].confidence, 0.0);
    }

    #[test]
    fn test_grid_fallback_matches_formula() {
        let dims = ImageDimensions {
            width: 1000,
            height: 750,
        };
        let entries: Vec<RawDetection> = (0..7).map(|_| raw(None, 0.1)).collect();
        let out = normalize(&entries, dims, 0);

        for (i, d) in out.iter().enumerate() {
            let w = (1000 / 3) as f64;
            let h = (750 / 4) as f64;
            let expected = BoundingBox {
                x: (i % 3) as f64 * w,
                y: (i / 3) as f64 * h,
                w,
                h,
            };
            assert_eq!(d.bounding_box, expected, "index {}", i);
        }
    }

    #[test]
    fn test_incomplete_box_uses_grid() {
        let mut entry = raw(None, 0.1);
        entry.bbox = Some(RawBoundingBox {
            x: Some(10.0),
            y: None,
            w: Some(5.0),
            h: Some(5.0),
            unit: BoxUnit::Px,
        });
        let out = normalize(&[raw(None, 0.1), entry], DIMS, 0);
        assert_eq!(out[1].bounding_box, grid_box(1, DIMS));
    }

    #[test]
    fn test_percent_box_scaled_to_pixels() {
        let content = r#"{"detections":[{"partId":"A","confidence":0.9,
            "bbox":{"x":10,"y":50,"w":25,"h":20,"unit":"percent"}}]}"#;
        let out = normalize_content(content, DIMS, 0);
        assert_eq!(
            out[0].bounding_box,
            BoundingBox {
                x: 80.0,
                y: 300.0,
                w: 200.0,
                h: 120.0
            }
        );
    }

    #[test]
    fn test_accepts_bare_array_and_bounding_box_alias() {
        let content = r#"[{"partId":"A","confidence":0.8,
            "boundingBox":{"x":1,"y":2,"w":3,"h":4},"recognized":true,"detectionId":"ignored"}]"#;
        let out = normalize_content(content, DIMS, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].bounding_box,
            BoundingBox {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0
            }
        );
        assert_ne!(out[0].detection_id, "ignored");
    }

    #[test]
    fn test_missing_or_null_detections_key_is_empty() {
        assert!(normalize_content("{}", DIMS, 0).is_empty());
        assert!(normalize_content(r#"{"detections":null}"#, DIMS, 0).is_empty());
    }

    #[test]
    fn test_malformed_payload_is_empty() {
        assert!(normalize_content("not json", DIMS, 0).is_empty());
        assert!(normalize_content(r#"{"detections":"many"}"#, DIMS, 0).is_empty());
        assert!(normalize_content(r#"[{"confidence":"high"}]"#, DIMS, 0).is_empty());
    }

    #[test]
    fn test_detection_ids_are_fresh() {
        let out = normalize(&[raw(None, 0.1), raw(None, 0.1)], DIMS, 0);
        assert_ne!(out[0].detection_id, out[1].detection_id);
    }
}
