//! Size variant resolution for recognized detections
//!
//! A recognized detection only names a part; it is billed against that part's
//! first declared size variant. Parts that are unknown or have no variants
//! leave the detection without a variant, which keeps it off invoices.

use fitscan_common::models::Detection;
use fitscan_common::Result;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};

use crate::db::parts;

/// Resolve every recognized detection with one catalog query
pub async fn resolve_size_variants(
    pool: &SqlitePool,
    detections: Vec<Detection>,
) -> Result<Vec<Detection>> {
    let part_ids: Vec<String> = detections
        .iter()
        .filter(|d| d.recognized)
        .filter_map(|d| d.part_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if part_ids.is_empty() {
        return Ok(detections);
    }

    let first_variants = parts::first_variant_ids(pool, &part_ids).await?;
    Ok(apply_first_variants(detections, &first_variants))
}

/// Replace placeholder variant ids using a part id → first variant id map
pub fn apply_first_variants(
    detections: Vec<Detection>,
    first_variants: &HashMap<String, String>,
) -> Vec<Detection> {
    detections
        .into_iter()
        .map(|mut d| {
            if d.recognized {
                d.size_variant_id = d
                    .part_id
                    .as_ref()
                    .and_then(|p| first_variants.get(p))
                    .cloned();
                if d.size_variant_id.is_none() {
                    tracing::debug!(
                        part_id = ?d.part_id,
                        detection_id = %d.detection_id,
                        "Recognized part has no catalog variant"
                    );
                }
            }
            d
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitscan_common::models::BoundingBox;

    fn detection(recognized: bool, part: Option<&str>) -> Detection {
        Detection {
            detection_id: fitscan_common::ids::detection_id(),
            image_index: 0,
            bounding_box: BoundingBox { x: 0.0, y: 0.0, w: 1.0, h: 1.0 },
            recognized,
            confidence: if recognized { 0.9 } else { 0.2 },
            part_id: part.map(str::to_string),
            size_variant_id: part.map(str::to_string),
            guidance: (!recognized).then(|| "retake".to_string()),
        }
    }

    #[test]
    fn test_first_variant_replaces_placeholder() {
        let map = HashMap::from([("100A".to_string(), "v-first".to_string())]);
        let out = apply_first_variants(vec![detection(true, Some("100A"))], &map);
        assert_eq!(out[0].size_variant_id.as_deref(), Some("v-first"));
    }

    #[test]
    fn test_unknown_part_loses_variant() {
        let out = apply_first_variants(vec![detection(true, Some("ghost"))], &HashMap::new());
        assert_eq!(out[0].part_id.as_deref(), Some("ghost"));
        assert!(out[0].size_variant_id.is_none());
        assert!(out[0].billable_key().is_none());
    }

    #[test]
    fn test_unrecognized_untouched() {
        let map = HashMap::from([("100A".to_string(), "v-first".to_string())]);
        let input = detection(false, None);
        let out = apply_first_variants(vec![input.clone()], &map);
        assert_eq!(out[0], input);
    }
}
