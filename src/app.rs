//! Application orchestration for generating an illustrated story.

use crate::ai::mime;
use crate::ai::{
    ImageJobService, LeonardoImageClient, OpenAiImageClient, OpenAiStoryClient,
    OpenAiTranslationClient, StoryService, TranslationService,
};
use crate::models::{
    Config, Illustration, ImageProvider, ImageRef, Language, Scene, StoryBook, StoryRequest,
};
use crate::poller::{JobPoller, PollConfig, PollOutcome, PollProgress};
use crate::{story, Error, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_retry::{strategy::FixedInterval, Retry};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

const CANCELLED_REASON: &str = "cancelled before this scene was illustrated";

/// Coordinates story generation, translation and per-scene illustration.
pub struct App {
    story: Box<dyn StoryService>,
    translator: Box<dyn TranslationService>,
    images: Box<ImageJobService>,
    output_dir: PathBuf,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub story: Box<dyn StoryService>,
    pub translator: Box<dyn TranslationService>,
    pub images: Box<ImageJobService>,
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, output_dir: PathBuf) -> Self {
        Self {
            story: services.story,
            translator: services.translator,
            images: services.images,
            output_dir,
        }
    }

    /// Construct the real provider clients from `config` and create a fresh
    /// output directory for this run.
    pub fn new(config: &Config) -> Result<Self> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let output_dir = config
            .output_dir
            .join(format!("{}_{}", date, Uuid::new_v4()));

        fs::create_dir_all(&output_dir)?;
        info!("Created output directory: {}", output_dir.display());

        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Story model: {}", config.story_model);
        let story = Box::new(OpenAiStoryClient::new_with_client(
            config.openai_api_key.clone(),
            config.story_model.clone(),
            http_client.clone(),
        ));
        let translator = Box::new(OpenAiTranslationClient::new_with_client(
            config.openai_api_key.clone(),
            config.translation_model.clone(),
            http_client.clone(),
        ));

        let images: Box<ImageJobService> = match config.image_provider {
            ImageProvider::OpenAi => {
                let model = config
                    .image_model()
                    .ok_or_else(|| Error::Config("IMAGE_MODEL not set".to_string()))?;
                info!("Image provider: OpenAI (model: {})", model);
                Box::new(OpenAiImageClient::new_with_client(
                    config.openai_api_key.clone(),
                    model.to_string(),
                    http_client,
                ))
            }
            ImageProvider::Leonardo => {
                let api_key = config.leonardo_api_key.clone().ok_or_else(|| {
                    Error::Config(
                        "LEONARDO_API_KEY not set (required for the Leonardo provider)"
                            .to_string(),
                    )
                })?;
                info!(
                    "Image provider: Leonardo (model: {})",
                    config.image_model().unwrap_or("account default")
                );
                Box::new(LeonardoImageClient::new_with_client(
                    api_key,
                    config.image_model().map(str::to_string),
                    http_client,
                ))
            }
        };

        Ok(Self::with_services(
            AppServices {
                story,
                translator,
                images,
            },
            output_dir,
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Generate, translate and illustrate one story.
    ///
    /// Scenes are illustrated one at a time, in order. Illustration failures
    /// never fail the run; they are recorded on the scene instead.
    pub async fn run(
        &self,
        request: &StoryRequest,
        poll: &PollConfig,
        cancel: CancellationToken,
    ) -> Result<StoryBook> {
        info!(
            "Generating {:?} {} story for {} in {}",
            request.length, request.theme, request.name, request.language
        );

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Cancelled during story generation");
                return Err(Error::Cancelled);
            }
            text = self.generate_story_with_retry(request) => text?,
        };
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Cancelled during translation");
                return Err(Error::Cancelled);
            }
            text = self.translate_or_passthrough(text, request.language) => text,
        };

        let paragraphs = story::split_paragraphs(&text);
        if paragraphs.is_empty() {
            return Err(Error::AiProvider("Story text has no paragraphs".to_string()));
        }
        info!("Story has {} scene(s) to illustrate", paragraphs.len());

        let mut scenes = Vec::with_capacity(paragraphs.len());
        for (index, paragraph) in paragraphs.into_iter().enumerate() {
            let illustration = if cancel.is_cancelled() {
                Illustration::Unavailable {
                    reason: CANCELLED_REASON.to_string(),
                }
            } else {
                self.illustrate(index, &paragraph, poll, cancel.clone())
                    .await?
            };

            scenes.push(Scene {
                index,
                text: paragraph,
                illustration,
            });
        }

        Ok(StoryBook {
            title: story::title(request),
            request: request.clone(),
            scenes,
        })
    }

    async fn generate_story_with_retry(&self, request: &StoryRequest) -> Result<String> {
        let retry_strategy = FixedInterval::from_millis(2000).take(3);

        Retry::spawn(retry_strategy, move || async move {
            match self.story.generate_story(request).await {
                Ok(text) => {
                    info!("Generated story ({} chars)", text.len());
                    Ok(text)
                }
                Err(e) => {
                    warn!("Story attempt failed: {}. Will retry...", e);
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| {
            error!("Story generation failed after retries: {}", e);
            e
        })
    }

    /// Translation failures fall back to the untranslated text.
    async fn translate_or_passthrough(&self, text: String, language: Language) -> String {
        if language == Language::English {
            return text;
        }

        match self.translator.translate(&text, language).await {
            Ok(translated) => {
                info!("Translated story to {}", language);
                translated
            }
            Err(e) => {
                warn!(
                    "Translation to {} failed: {}. Keeping original text",
                    language, e
                );
                text
            }
        }
    }

    async fn illustrate(
        &self,
        index: usize,
        paragraph: &str,
        poll: &PollConfig,
        cancel: CancellationToken,
    ) -> Result<Illustration> {
        let scene = index + 1;
        let request = story::illustration_request(paragraph);
        let log_progress = move |progress: PollProgress| {
            info!(
                "[scene {}] Illustration attempt {}/{}: {:?}",
                scene, progress.attempt, progress.max_attempts, progress.state
            );
        };

        let outcome = JobPoller::new(self.images.as_ref())
            .with_progress(&log_progress)
            .with_cancellation(cancel)
            .submit_and_await(&request, poll)
            .await;

        let illustration = match outcome {
            PollOutcome::Ready(ImageRef::Url(url)) => Illustration::Url { url },
            PollOutcome::Ready(ImageRef::Bytes(bytes)) => Illustration::File {
                path: self.save_image(scene, &bytes)?,
            },
            PollOutcome::TimedOut => Illustration::Unavailable {
                reason: format!(
                    "timed out after {} status checks",
                    poll.max_attempts()
                ),
            },
            PollOutcome::Error(e) => Illustration::Unavailable {
                reason: e.to_string(),
            },
            PollOutcome::Cancelled => Illustration::Unavailable {
                reason: CANCELLED_REASON.to_string(),
            },
        };

        match &illustration {
            Illustration::Unavailable { reason } => {
                warn!("[scene {}] Illustration unavailable: {}", scene, reason)
            }
            _ => info!("[scene {}] Illustration ready", scene),
        }
        Ok(illustration)
    }

    /// Store inline image bytes next to the story; returns the file name.
    fn save_image(&self, scene: usize, bytes: &[u8]) -> Result<String> {
        let extension = mime::extension_for(mime::detect_image_mime(bytes));
        let file_name = format!("scene_{:02}.{}", scene, extension);
        fs::write(self.output_dir.join(&file_name), bytes)?;
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices};
    use crate::ai::{MockStoryClient, MockTranslationClient};
    use crate::models::{
        Config, Illustration, IllustrationRequest, ImageProvider, ImageRef, Language, StoryRequest,
    };
    use crate::poller::{JobStatus, MockJobService, PollConfig};
    use crate::Error;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    const THREE_SCENES: &str = "Aiden met a rabbit.\n\nThey found a map.\n\nThey went home.";
    const PNG_BYTES: [u8; 6] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A];

    type MockImages = MockJobService<IllustrationRequest, ImageRef>;

    fn setup_test_dir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("output");
        fs::create_dir_all(&output_dir).unwrap();
        (dir, output_dir)
    }

    fn build_test_app(
        output_dir: &Path,
        story: MockStoryClient,
        translator: MockTranslationClient,
        images: MockImages,
    ) -> App {
        App::with_services(
            AppServices {
                story: Box::new(story),
                translator: Box::new(translator),
                images: Box::new(images),
            },
            output_dir.to_path_buf(),
        )
    }

    fn poll(max_attempts: u32) -> PollConfig {
        PollConfig::new(max_attempts, Duration::ZERO).unwrap()
    }

    #[tokio::test]
    async fn test_run_illustrates_every_scene_in_order() {
        let (_dir, output_dir) = setup_test_dir();
        let images = MockImages::new()
            .with_status(JobStatus::Pending)
            .with_status(JobStatus::Succeeded(ImageRef::Url("https://img/1".to_string())))
            .with_status(JobStatus::Succeeded(ImageRef::Url("https://img/2".to_string())))
            .with_status(JobStatus::Processing)
            .with_status(JobStatus::Succeeded(ImageRef::Url("https://img/3".to_string())));
        let probe = images.clone();

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_story_response(THREE_SCENES.to_string()),
            MockTranslationClient::new(),
            images,
        );

        let book = app
            .run(&StoryRequest::default(), &poll(3), CancellationToken::new())
            .await
            .unwrap();

        let texts: Vec<&str> = book.scenes.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Aiden met a rabbit.", "They found a map.", "They went home."]
        );
        let urls: Vec<Illustration> = book.scenes.iter().map(|s| s.illustration.clone()).collect();
        assert_eq!(
            urls,
            vec![
                Illustration::Url { url: "https://img/1".to_string() },
                Illustration::Url { url: "https://img/2".to_string() },
                Illustration::Url { url: "https://img/3".to_string() },
            ]
        );
        assert_eq!(probe.get_submit_count(), 3);
        assert!(probe.get_submitted()[1].prompt.contains("They found a map."));
    }

    #[tokio::test]
    async fn test_run_saves_inline_images() {
        let (_dir, output_dir) = setup_test_dir();
        let images = MockImages::new().with_immediate_result(ImageRef::Bytes(PNG_BYTES.to_vec()));

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_story_response("Only scene.".to_string()),
            MockTranslationClient::new(),
            images,
        );

        let book = app
            .run(&StoryRequest::default(), &poll(3), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            book.scenes[0].illustration,
            Illustration::File {
                path: "scene_01.png".to_string()
            }
        );
        assert_eq!(
            fs::read(output_dir.join("scene_01.png")).unwrap(),
            PNG_BYTES.to_vec()
        );
    }

    #[tokio::test]
    async fn test_failed_and_timed_out_scenes_are_unavailable() {
        let (_dir, output_dir) = setup_test_dir();
        let images = MockImages::new()
            .with_status(JobStatus::Failed("nsfw filter".to_string()))
            .with_status(JobStatus::Pending)
            .with_status(JobStatus::Pending);

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_story_response("First.\nSecond.".to_string()),
            MockTranslationClient::new(),
            images,
        );

        let book = app
            .run(&StoryRequest::default(), &poll(2), CancellationToken::new())
            .await
            .unwrap();

        match &book.scenes[0].illustration {
            Illustration::Unavailable { reason } => assert!(reason.contains("nsfw filter")),
            other => panic!("expected unavailable, got {:?}", other),
        }
        match &book.scenes[1].illustration {
            Illustration::Unavailable { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translation_applied_for_non_english() {
        let (_dir, output_dir) = setup_test_dir();
        let translator = MockTranslationClient::new();
        let translator_probe = translator.clone();

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_story_response("Hello.\n\nBye.".to_string()),
            translator,
            MockImages::new().with_immediate_result(ImageRef::Url("https://img".to_string())),
        );

        let request = StoryRequest {
            language: Language::French,
            ..StoryRequest::default()
        };
        let book = app
            .run(&request, &poll(1), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(translator_probe.get_call_count(), 1);
        assert_eq!(book.scenes[0].text, "[fr] Hello.");
        assert_eq!(book.scenes[1].text, "[fr] Bye.");
    }

    #[tokio::test]
    async fn test_translation_failure_passes_original_text_through() {
        let (_dir, output_dir) = setup_test_dir();

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_story_response("Hello.".to_string()),
            MockTranslationClient::new().with_failure(true),
            MockImages::new().with_immediate_result(ImageRef::Url("https://img".to_string())),
        );

        let request = StoryRequest {
            language: Language::Turkish,
            ..StoryRequest::default()
        };
        let book = app
            .run(&request, &poll(1), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(book.scenes[0].text, "Hello.");
    }

    #[tokio::test]
    async fn test_english_skips_translation() {
        let (_dir, output_dir) = setup_test_dir();
        let translator = MockTranslationClient::new();
        let translator_probe = translator.clone();

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new(),
            translator,
            MockImages::new().with_immediate_result(ImageRef::Url("https://img".to_string())),
        );

        app.run(&StoryRequest::default(), &poll(1), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(translator_probe.get_call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_story_generation_retries_then_succeeds() {
        let (_dir, output_dir) = setup_test_dir();
        let story = MockStoryClient::new()
            .with_story_response("Finally a story.".to_string())
            .with_failures(2);
        let story_probe = story.clone();

        let app = build_test_app(
            &output_dir,
            story,
            MockTranslationClient::new(),
            MockImages::new().with_immediate_result(ImageRef::Url("https://img".to_string())),
        );

        let book = app
            .run(&StoryRequest::default(), &poll(1), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(story_probe.get_call_count(), 3);
        assert_eq!(book.scenes[0].text, "Finally a story.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_story_generation_failure_is_an_error() {
        let (_dir, output_dir) = setup_test_dir();
        let images = MockImages::new();
        let images_probe = images.clone();

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_failures(10),
            MockTranslationClient::new(),
            images,
        );

        let err = app
            .run(&StoryRequest::default(), &poll(1), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AiProvider(_)));
        assert_eq!(images_probe.get_submit_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_marks_remaining_scenes() {
        let (_dir, output_dir) = setup_test_dir();
        let images = MockImages::new();
        let images_probe = images.clone();
        let token = CancellationToken::new();

        let app = build_test_app(
            &output_dir,
            MockStoryClient::new().with_story_response(THREE_SCENES.to_string()),
            MockTranslationClient::new(),
            images,
        );

        let cancel_after_first_query = {
            let token = token.clone();
            let probe = images_probe.clone();
            async move {
                while probe.get_status_count() == 0 {
                    tokio::task::yield_now().await;
                }
                token.cancel();
            }
        };

        let request = StoryRequest::default();
        let slow_poll = PollConfig::new(100, Duration::from_secs(3600)).unwrap();
        let (book, _) = tokio::join!(
            app.run(&request, &slow_poll, token.clone()),
            cancel_after_first_query
        );
        let book = book.unwrap();

        assert_eq!(images_probe.get_submit_count(), 1);
        assert_eq!(images_probe.get_status_count(), 1);
        assert!(book.scenes.iter().all(|scene| matches!(
            &scene.illustration,
            Illustration::Unavailable { reason } if reason.contains("cancelled")
        )));
    }

    #[tokio::test]
    async fn test_run_cancelled_before_start() {
        let (_dir, output_dir) = setup_test_dir();
        let story = MockStoryClient::new();
        let story_probe = story.clone();
        let token = CancellationToken::new();
        token.cancel();

        let app = build_test_app(
            &output_dir,
            story,
            MockTranslationClient::new(),
            MockImages::new(),
        );

        let err = app
            .run(&StoryRequest::default(), &poll(1), token)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(story_probe.get_call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_story_retries_stops_run() {
        let (_dir, output_dir) = setup_test_dir();
        let story = MockStoryClient::new().with_failures(10);
        let story_probe = story.clone();
        let images = MockImages::new();
        let images_probe = images.clone();
        let token = CancellationToken::new();

        let app = build_test_app(&output_dir, story, MockTranslationClient::new(), images);

        let cancel_soon = {
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                token.cancel();
            }
        };

        let request = StoryRequest::default();
        let started = tokio::time::Instant::now();
        let poll_config = poll(1);
        let (result, _) = tokio::join!(app.run(&request, &poll_config, token.clone()), cancel_soon);

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(story_probe.get_call_count(), 1);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(images_probe.get_submit_count(), 0);
    }

    #[test]
    fn test_new_requires_leonardo_key_for_leonardo() {
        let (_dir, output_dir) = setup_test_dir();
        let config = Config {
            openai_api_key: "sk-test".to_string(),
            leonardo_api_key: None,
            story_model: "gpt-4".to_string(),
            translation_model: "gpt-4o-mini".to_string(),
            image_provider: ImageProvider::Leonardo,
            image_model: None,
            poll: PollConfig::default(),
            output_dir,
        };

        let err = App::new(&config).err().unwrap();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("LEONARDO_API_KEY")));

        let app = App::new(&config.with_image_provider(ImageProvider::OpenAi)).unwrap();
        assert!(app.output_dir().exists());
    }
}
