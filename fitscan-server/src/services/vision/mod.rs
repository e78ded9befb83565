//! Vision analysis
//!
//! Providers are tried in order: OpenAI-compatible chat completions (when an
//! API key is configured), then the remote vision service (when a URL is
//! configured), then the built-in stub. A provider that is unreachable hands
//! over to the next one; a provider that answers with a payload that does not
//! match the detection schema ends the chain with no detections for that image.

mod openai;
mod remote;
mod stub;

pub use openai::OpenAiVision;
pub use remote::RemoteVisionService;
pub use stub::StubVision;

use async_trait::async_trait;
use fitscan_common::models::Detection;
use std::sync::Arc;
use thiserror::Error;

use super::detection_normalizer::{self, ImageDimensions, RawDetection};
use super::reference_catalog::CatalogReader;

/// Vision provider errors
#[derive(Debug, Error)]
pub enum VisionError {
    /// Provider not configured, unreachable, or answered with an error status
    #[error("Vision provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered but the payload does not decode
    #[error("Malformed vision payload: {0}")]
    Malformed(String),
}

/// One uploaded image handed to a provider
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

impl ImageInput<'_> {
    pub fn mime_type(&self) -> &'static str {
        mime_for(self.file_name)
    }
}

/// Source of raw detections for one image
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, image: &ImageInput<'_>) -> Result<Vec<RawDetection>, VisionError>;
}

/// Vision settings after config resolution
#[derive(Debug, Clone, PartialEq)]
pub struct VisionConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub service_url: Option<String>,
    pub default_dimensions: ImageDimensions,
}

/// Ordered provider chain with the stub as the last resort
pub struct VisionAnalyzer {
    providers: Vec<Arc<dyn VisionProvider>>,
    fallback: StubVision,
    dims: ImageDimensions,
}

impl VisionAnalyzer {
    pub fn from_config(config: &VisionConfig, catalog: Arc<dyn CatalogReader>) -> Self {
        let mut providers: Vec<Arc<dyn VisionProvider>> = Vec::new();

        if let Some(api_key) = &config.openai_api_key {
            match OpenAiVision::new(
                api_key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                catalog,
            ) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => tracing::warn!(error = %e, "OpenAI vision client not created"),
            }
        }

        if let Some(url) = &config.service_url {
            match RemoteVisionService::new(url.clone()) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => tracing::warn!(error = %e, "Remote vision client not created"),
            }
        }

        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        tracing::info!(providers = ?names, "Vision chain configured (stub fallback last)");

        Self::with_providers(providers, config.default_dimensions)
    }

    pub fn with_providers(providers: Vec<Arc<dyn VisionProvider>>, dims: ImageDimensions) -> Self {
        Self {
            providers,
            fallback: StubVision,
            dims,
        }
    }

    /// Detections for one image, `image_index` already applied
    pub async fn analyze(&self, image: &ImageInput<'_>, image_index: usize) -> Vec<Detection> {
        for provider in &self.providers {
            match provider.analyze(image).await {
                Ok(raw) => {
                    tracing::debug!(
                        provider = provider.name(),
                        image_index,
                        raw_detections = raw.len(),
                        "Vision analysis complete"
                    );
                    return detection_normalizer::normalize(&raw, self.dims, image_index);
                }
                Err(VisionError::Unavailable(msg)) => {
                    tracing::warn!(
                        provider = provider.name(),
                        image_index,
                        "Vision provider failed, trying next: {}",
                        msg
                    );
                }
                Err(VisionError::Malformed(msg)) => {
                    tracing::warn!(
                        provider = provider.name(),
                        image_index,
                        "Vision payload rejected, image yields no detections: {}",
                        msg
                    );
                    return Vec::new();
                }
            }
        }

        let raw = self.fallback.detections();
        detection_normalizer::normalize(&raw, self.dims, image_index)
    }
}

/// Content type for an uploaded image, from its extension
pub fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}
