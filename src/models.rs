//! Data models and structures
//!
//! Defines the story request inputs, the generated story book, and runtime
//! configuration loaded from the environment.

use crate::poller::{PollConfig, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Adventure,
    Friendship,
    Magic,
    Mystery,
    Courage,
    Exploration,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Adventure,
        Theme::Friendship,
        Theme::Magic,
        Theme::Mystery,
        Theme::Courage,
        Theme::Exploration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Adventure => "Adventure",
            Theme::Friendship => "Friendship",
            Theme::Magic => "Magic",
            Theme::Mystery => "Mystery",
            Theme::Courage => "Courage",
            Theme::Exploration => "Exploration",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown theme '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    Medium,
    Long,
}

impl StoryLength {
    /// Completion token budget for the story text.
    pub fn max_tokens(&self) -> u32 {
        match self {
            StoryLength::Short => 300,
            StoryLength::Medium => 600,
            StoryLength::Long => 1200,
        }
    }
}

impl FromStr for StoryLength {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(StoryLength::Short),
            "medium" => Ok(StoryLength::Medium),
            "long" => Ok(StoryLength::Long),
            _ => Err(format!(
                "Unknown story length '{}'. Expected short, medium or long",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    French,
    Dutch,
    German,
    Italian,
    Spanish,
    Turkish,
    Japanese,
    Korean,
    Portuguese,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::English,
        Language::French,
        Language::Dutch,
        Language::German,
        Language::Italian,
        Language::Spanish,
        Language::Turkish,
        Language::Japanese,
        Language::Korean,
        Language::Portuguese,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::French => "French",
            Language::Dutch => "Dutch",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Spanish => "Spanish",
            Language::Turkish => "Turkish",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
            Language::Portuguese => "Portuguese",
        }
    }

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Dutch => "nl",
            Language::German => "de",
            Language::Italian => "it",
            Language::Spanish => "es",
            Language::Turkish => "tr",
            Language::Japanese => "ja",
            Language::Korean => "ko",
            Language::Portuguese => "pt",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| {
                lang.name().eq_ignore_ascii_case(s) || lang.code().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| format!("Unsupported language '{}'", s))
    }
}

/// Inputs for one personalized story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRequest {
    pub name: String,
    pub favorite_animal: String,
    pub theme: Theme,
    pub length: StoryLength,
    pub language: Language,
}

impl Default for StoryRequest {
    fn default() -> Self {
        Self {
            name: "Aiden".to_string(),
            favorite_animal: "Rabbit".to_string(),
            theme: Theme::Adventure,
            length: StoryLength::Short,
            language: Language::English,
        }
    }
}

/// Illustration prompt for one scene, submitted as an image job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllustrationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl IllustrationRequest {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            width: 512,
            height: 512,
        }
    }
}

/// A finished image: either hosted by the provider or returned inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    Bytes(Vec<u8>),
}

/// Per-scene illustration result as shown to the reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Illustration {
    Url { url: String },
    File { path: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub index: usize,
    pub text: String,
    pub illustration: Illustration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryBook {
    pub title: String,
    pub request: StoryRequest,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    OpenAi,
    Leonardo,
}

impl ImageProvider {
    /// Leonardo falls back to the account's default model when none is given.
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ImageProvider::OpenAi => Some("dall-e-3"),
            ImageProvider::Leonardo => None,
        }
    }
}

impl FromStr for ImageProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ImageProvider::OpenAi),
            "leonardo" => Ok(ImageProvider::Leonardo),
            _ => Err(format!(
                "Unknown image provider '{}'. Expected openai or leonardo",
                s
            )),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub leonardo_api_key: Option<String>,
    pub story_model: String,
    pub translation_model: String,
    pub image_provider: ImageProvider,
    /// Explicit model override; otherwise the provider default is used.
    pub image_model: Option<String>,
    pub poll: PollConfig,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn image_model(&self) -> Option<&str> {
        self.image_model
            .as_deref()
            .or_else(|| self.image_provider.default_model())
    }

    /// Switch image provider. A model chosen for the previous provider is
    /// dropped so the new provider's default applies.
    pub fn with_image_provider(mut self, provider: ImageProvider) -> Self {
        if provider != self.image_provider {
            self.image_provider = provider;
            self.image_model = None;
        }
        self
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let openai_api_key = non_empty("OPENAI_API_KEY")
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;

        let image_provider = match non_empty("IMAGE_PROVIDER") {
            Some(value) => value.parse::<ImageProvider>().map_err(Error::Config)?,
            None => ImageProvider::Leonardo,
        };

        let leonardo_api_key = non_empty("LEONARDO_API_KEY");

        let max_attempts = match non_empty("POLL_MAX_ATTEMPTS") {
            Some(value) => value.trim().parse::<u32>().map_err(|_| {
                Error::Config(format!("POLL_MAX_ATTEMPTS must be an integer, got '{}'", value))
            })?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        let interval = match non_empty("POLL_INTERVAL_SECS") {
            Some(value) => Duration::from_secs(value.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "POLL_INTERVAL_SECS must be a whole number of seconds, got '{}'",
                    value
                ))
            })?),
            None => DEFAULT_INTERVAL,
        };

        Ok(Self {
            openai_api_key,
            leonardo_api_key,
            story_model: non_empty("STORY_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
            translation_model: non_empty("TRANSLATION_MODEL")
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            image_model: non_empty("IMAGE_MODEL"),
            image_provider,
            poll: PollConfig::new(max_attempts, interval)?,
            output_dir: non_empty("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
        })
    }
}
