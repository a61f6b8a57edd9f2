//! Leonardo REST payloads for the generations endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /generations`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "num_images")]
    pub num_images: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationResponse {
    pub sd_generation_job: GenerationJob,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub generation_id: String,
}

/// Body of `GET /generations/{id}`.
#[derive(Debug, Deserialize)]
pub struct GenerationStatusResponse {
    /// Null for a short while after the job is created.
    pub generations_by_pk: Option<Generation>,
}

#[derive(Debug, Deserialize)]
pub struct Generation {
    pub status: String,
    #[serde(default)]
    pub generated_images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}
