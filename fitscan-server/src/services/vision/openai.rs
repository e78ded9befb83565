//! OpenAI-compatible chat completions provider
//!
//! Sends the image as a base64 data URL together with a prompt listing the
//! reference catalog, and asks for a JSON object with a `detections` array.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::{ImageInput, VisionError, VisionProvider};
use crate::services::detection_normalizer::{self, RawDetection};
use crate::services::reference_catalog::{build_catalog_prompt, CatalogReader};

const USER_AGENT: &str = concat!("fitscan/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = r#"You are an expert at identifying industrial fluid fittings (camlock couplings and similar parts) in photos. You analyze images and return a JSON object with a single key "detections" whose value is an array of objects. Each object must have:
- partId: string or null. Use the exact catalog partId (e.g. 100A, 200B) if the part clearly matches; otherwise null.
- confidence: number between 0 and 1 (how sure you are).
- guidance: string only when partId is null or confidence < 0.7. One of: "retake", "rotate", "flip" to suggest how to improve the image.
- bbox (optional): { x, y, w, h } in pixels from top-left. If you give percentages 0-100 of image width/height instead, add "unit": "percent". Approximate the region where each part appears.

Rules:
- List EVERY distinct part visible in the image. Do not skip any.
- If you cannot identify a part, set partId to null and give guidance (e.g. "rotate" if it needs a better angle).
- Recognized parts must have partId from the catalog and confidence >= 0.7.
- Return only valid JSON, no markdown or extra text."#;

const USER_INSTRUCTIONS: &str = r#"Analyze this image of parts (possibly on a mat or surface). List each part you see. For each part, identify it with the catalog partId if it clearly matches a catalog type/size; otherwise set partId to null and provide guidance. If the image has no parts or is unclear, return {"detections":[]} or a single detection with partId null and guidance "retake"."#;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiVision {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    catalog: Arc<dyn CatalogReader>,
}

impl OpenAiVision {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        catalog: Arc<dyn CatalogReader>,
    ) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            catalog,
        })
    }

    fn request_body(&self, image: &ImageInput<'_>) -> serde_json::Value {
        let data_url = format!(
            "data:{};base64,{}",
            image.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(image.bytes)
        );
        let user_prompt = format!(
            "{}\n\n{}",
            build_catalog_prompt(&self.catalog.entries()),
            USER_INSTRUCTIONS
        );

        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": user_prompt },
                        { "type": "image_url", "image_url": { "url": data_url } }
                    ]
                }
            ],
            "max_tokens": MAX_TOKENS,
            "response_format": { "type": "json_object" }
        })
    }
}

#[async_trait]
impl VisionProvider for OpenAiVision {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn analyze(&self, image: &ImageInput<'_>) -> Result<Vec<RawDetection>, VisionError> {
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(model = %self.model, file = image.file_name, "Requesting vision completion");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| VisionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Unavailable(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Malformed(e.to_string()))?;

        let Some(content) = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
        else {
            return Ok(Vec::new());
        };

        detection_normalizer::parse_payload(&content).map_err(|e| VisionError::Malformed(e.to_string()))
    }
}
