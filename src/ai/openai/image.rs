use super::client::OpenAiHttpClient;
use super::types::{ImageGenerationRequest, ImageGenerationResponse};
use crate::models::{IllustrationRequest, ImageRef};
use crate::poller::{JobHandle, JobService, JobStatus, Submission};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

// OpenAI only accepts a fixed set of sizes; requested dimensions are ignored.
const IMAGE_SIZE: &str = "1024x1024";

/// Synchronous image provider: every submission completes immediately.
pub struct OpenAiImageClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(120), client),
            model,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl JobService for OpenAiImageClient {
    type Request = IllustrationRequest;
    type Output = ImageRef;

    async fn submit(&self, request: &IllustrationRequest) -> Result<Submission<ImageRef>> {
        let body = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            n: 1,
            size: IMAGE_SIZE.to_string(),
        };

        let response: ImageGenerationResponse =
            self.http.post("/v1/images/generations", &body).await?;

        let image_data = response
            .data
            .first()
            .ok_or_else(|| Error::AiProvider("No image data in OpenAI response".to_string()))?;

        let image = if let Some(b64_json) = &image_data.b64_json {
            use base64::Engine as _;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64_json)
                .map_err(|e| {
                    Error::AiProvider(format!("Failed to decode OpenAI base64 image: {}", e))
                })?;
            ImageRef::Bytes(bytes)
        } else if let Some(url) = &image_data.url {
            ImageRef::Url(url.clone())
        } else {
            return Err(Error::AiProvider(
                "No image data (neither base64 nor URL) in response".to_string(),
            ));
        };

        Ok(Submission::Completed(image))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus<ImageRef>> {
        Err(Error::Invariant(format!(
            "OpenAI image generation is synchronous; no status for job {}",
            handle
        )))
    }
}
