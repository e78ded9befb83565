//! Remote vision service provider
//!
//! The service exposes `GET /health` and `POST /analyze` (multipart field
//! `image`); `/analyze` answers with the same detection payload shape as the
//! chat provider.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::{ImageInput, VisionError, VisionProvider};
use crate::services::detection_normalizer::{self, RawDetection};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct RemoteVisionService {
    http_client: reqwest::Client,
    base_url: String,
}

impl RemoteVisionService {
    pub fn new(base_url: String) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .timeout(ANALYZE_TIMEOUT)
            .build()
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check_health(&self) -> Result<(), VisionError> {
        let response = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(VisionError::Unavailable(format!(
                "health check returned HTTP {}",
                response.status().as_u16()
            )))
        }
    }
}

#[async_trait]
impl VisionProvider for RemoteVisionService {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn analyze(&self, image: &ImageInput<'_>) -> Result<Vec<RawDetection>, VisionError> {
        self.check_health().await?;

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.to_string())
            .mime_str(image.mime_type())
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self
            .http_client
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::Unavailable(format!("analyze returned HTTP {}", status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;

        detection_normalizer::parse_payload(&body).map_err(|e| VisionError::Malformed(e.to_string()))
    }
}
