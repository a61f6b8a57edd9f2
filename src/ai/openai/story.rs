use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::StoryService;
use crate::models::StoryRequest;
use crate::{prompts, story, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

const STORY_TEMPERATURE: f32 = 0.8;

pub struct OpenAiStoryClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiStoryClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(60), client),
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
impl StoryService for OpenAiStoryClient {
    async fn generate_story(&self, request: &StoryRequest) -> Result<String> {
        let chat = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompts::STORY_SYSTEM),
                ChatMessage::user(story::story_prompt(request)),
            ],
            max_tokens: Some(request.length.max_tokens()),
            temperature: Some(STORY_TEMPERATURE),
        };

        let response = self.http.chat_completion(chat).await?;

        response
            .first_text()
            .ok_or_else(|| Error::AiProvider("No story text in OpenAI response".to_string()))
    }
}
