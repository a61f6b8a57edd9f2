use super::{StoryService, TranslationService};
use crate::models::{Language, StoryRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockStoryClient {
    responses: Arc<Mutex<Vec<String>>>,
    failures_remaining: Arc<Mutex<usize>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockStoryClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failures_remaining: Arc::new(Mutex::new(0)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_story_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Fail the next `count` calls before answering.
    pub fn with_failures(self, count: usize) -> Self {
        *self.failures_remaining.lock().unwrap() = count;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockStoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryService for MockStoryClient {
    async fn generate_story(&self, request: &StoryRequest) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let mut failures = self.failures_remaining.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(Error::AiProvider("Mock story failure".to_string()));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(format!(
                "Once upon a time, {} met a {}.\n\nThey shared a {} adventure.\n\nThe end.",
                request.name,
                request.favorite_animal,
                request.theme.as_str().to_lowercase()
            ))
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockTranslationClient {
    should_fail: Arc<Mutex<bool>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTranslationClient {
    pub fn new() -> Self {
        Self {
            should_fail: Arc::new(Mutex::new(false)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockTranslationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationService for MockTranslationClient {
    /// Prefixes every line with the language code, e.g. `[fr] ...`.
    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        *self.call_count.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(Error::AiProvider("Mock translation failure".to_string()));
        }

        Ok(text
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    line.to_string()
                } else {
                    format!("[{}] {}", target.code(), line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_story_default_mentions_request() {
        let client = MockStoryClient::new();

        let story = client
            .generate_story(&StoryRequest::default())
            .await
            .unwrap();
        assert!(story.contains("Aiden"));
        assert!(story.contains("Rabbit"));
    }

    #[tokio::test]
    async fn test_mock_story_fails_then_answers() {
        let client = MockStoryClient::new()
            .with_story_response("Custom story".to_string())
            .with_failures(1);

        assert!(client.generate_story(&StoryRequest::default()).await.is_err());
        assert_eq!(
            client
                .generate_story(&StoryRequest::default())
                .await
                .unwrap(),
            "Custom story"
        );
        assert_eq!(client.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_translation_prefixes_lines() {
        let client = MockTranslationClient::new();

        let translated = client
            .translate("Hello.\n\nBye.", Language::Spanish)
            .await
            .unwrap();
        assert_eq!(translated, "[es] Hello.\n\n[es] Bye.");
    }

    #[tokio::test]
    async fn test_mock_translation_failure() {
        let client = MockTranslationClient::new().with_failure(true);

        assert!(client.translate("Hello.", Language::Korean).await.is_err());
        assert_eq!(client.get_call_count(), 1);
    }
}
