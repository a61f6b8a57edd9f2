pub mod client;
pub mod image;
pub mod story;
pub mod translation;
pub mod types;

pub use image::OpenAiImageClient;
pub use story::OpenAiStoryClient;
pub use translation::OpenAiTranslationClient;
