//! StoryNest - personalized children's stories with one illustration per scene
//!
//! Generates a story from a child's name, favorite animal and theme, translates
//! it when needed, and illustrates each paragraph through an image provider.
//! Image providers that work asynchronously are driven by the [`poller`].

pub mod ai;
pub mod app;
pub mod error;
pub mod models;
pub mod poller;
pub mod prompts;
pub mod render;
pub mod story;

pub use error::{Error, Result};
