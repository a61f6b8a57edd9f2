//! AI service integration for story text, translation and illustrations
//!
//! Story and translation calls are plain request/response services. Image
//! providers are exposed as [`JobService`]s so synchronous and job-based
//! providers share one polling path.

pub mod leonardo;
pub mod mime;
pub mod mock;
pub mod openai;

pub use leonardo::LeonardoImageClient;
pub use mock::{MockStoryClient, MockTranslationClient};
pub use openai::{OpenAiImageClient, OpenAiStoryClient, OpenAiTranslationClient};

use crate::models::{IllustrationRequest, ImageRef, Language, StoryRequest};
use crate::poller::JobService;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StoryService: Send + Sync {
    async fn generate_story(&self, request: &StoryRequest) -> Result<String>;
}

#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(&self, text: &str, target: Language) -> Result<String>;
}

/// Image provider driven through the job poller.
pub type ImageJobService = dyn JobService<Request = IllustrationRequest, Output = ImageRef>;
