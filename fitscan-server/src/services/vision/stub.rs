//! Built-in stub provider
//!
//! Always answers with one recognized and one unrecognized detection, so the
//! whole pipeline works without any external vision backend.

use async_trait::async_trait;

use super::{ImageInput, VisionError, VisionProvider};
use crate::services::detection_normalizer::{RawBoundingBox, RawDetection};

pub const STUB_PART_ID: &str = "stub-part-1";

#[derive(Debug, Clone, Copy, Default)]
pub struct StubVision;

impl StubVision {
    pub fn detections(&self) -> Vec<RawDetection> {
        vec![
            RawDetection {
                part_id: Some(STUB_PART_ID.to_string()),
                confidence: Some(0.95),
                guidance: None,
                bbox: Some(px_box(50.0, 60.0, 120.0, 90.0)),
            },
            RawDetection {
                part_id: None,
                confidence: Some(0.3),
                guidance: Some("rotate".to_string()),
                bbox: Some(px_box(220.0, 80.0, 100.0, 85.0)),
            },
        ]
    }
}

fn px_box(x: f64, y: f64, w: f64, h: f64) -> RawBoundingBox {
    RawBoundingBox {
        x: Some(x),
        y: Some(y),
        w: Some(w),
        h: Some(h),
        ..Default::default()
    }
}

#[async_trait]
impl VisionProvider for StubVision {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn analyze(&self, _image: &ImageInput<'_>) -> Result<Vec<RawDetection>, VisionError> {
        Ok(self.detections())
    }
}
