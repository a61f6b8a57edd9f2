use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::TranslationService;
use crate::models::Language;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Chat-model translator. Callers decide what to do when it fails.
pub struct OpenAiTranslationClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiTranslationClient {
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
impl TranslationService for OpenAiTranslationClient {
    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        let system = prompts::render(prompts::TRANSLATION_SYSTEM, &[("language", target.name())]);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(text)],
            max_tokens: None,
            temperature: Some(0.0),
        };

        let response = self.http.chat_completion(request).await?;

        response.first_text().ok_or_else(|| {
            Error::AiProvider(format!("No {} translation in OpenAI response", target))
        })
    }
}
