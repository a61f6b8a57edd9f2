use super::client::LeonardoHttpClient;
use super::types::{CreateGenerationRequest, CreateGenerationResponse, GenerationStatusResponse};
use crate::models::{IllustrationRequest, ImageRef};
use crate::poller::{JobHandle, JobService, JobStatus, Submission};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Job-based image provider: submissions return a generation id to poll.
pub struct LeonardoImageClient {
    http: LeonardoHttpClient,
    model_id: Option<String>,
}

impl LeonardoImageClient {
    pub fn new(api_key: String, model_id: Option<String>) -> Self {
        Self::new_with_client(api_key, model_id, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model_id: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: LeonardoHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model_id,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl JobService for LeonardoImageClient {
    type Request = IllustrationRequest;
    type Output = ImageRef;

    async fn submit(&self, request: &IllustrationRequest) -> Result<Submission<ImageRef>> {
        let body = CreateGenerationRequest {
            prompt: request.prompt.clone(),
            model_id: self.model_id.clone(),
            width: request.width,
            height: request.height,
            num_images: 1,
        };

        let response: CreateGenerationResponse = self.http.post("/generations", &body).await?;
        let generation_id = response.sd_generation_job.generation_id;
        if generation_id.trim().is_empty() {
            return Err(Error::AiProvider(
                "Leonardo returned an empty generation id".to_string(),
            ));
        }

        Ok(Submission::Queued(JobHandle::new(generation_id)))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus<ImageRef>> {
        let response: GenerationStatusResponse = self
            .http
            .get(&format!("/generations/{}", handle.as_str()))
            .await?;

        let Some(generation) = response.generations_by_pk else {
            return Ok(JobStatus::Pending);
        };

        match generation.status.as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETE" => match generation.generated_images.into_iter().next() {
                Some(image) => Ok(JobStatus::Succeeded(ImageRef::Url(image.url))),
                None => Ok(JobStatus::Failed(
                    "generation completed without images".to_string(),
                )),
            },
            "FAILED" => Ok(JobStatus::Failed(format!(
                "Leonardo generation {} failed",
                handle
            ))),
            other => Err(Error::AiProvider(format!(
                "Unknown Leonardo generation status '{}'",
                other
            ))),
        }
    }
}
