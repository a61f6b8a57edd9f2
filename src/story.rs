//! Story text helpers: scene splitting and prompt assembly.

use crate::models::{IllustrationRequest, StoryRequest};
use crate::prompts;

/// Split story text into scenes, one per non-blank line, in order.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn title(request: &StoryRequest) -> String {
    format!(
        "{} and the {} {}",
        request.name, request.favorite_animal, request.theme
    )
}

pub fn story_prompt(request: &StoryRequest) -> String {
    prompts::render(
        prompts::STORY_USER,
        &[
            ("name", &request.name),
            ("animal", &request.favorite_animal),
            ("theme", request.theme.as_str()),
        ],
    )
}

pub fn illustration_request(scene: &str) -> IllustrationRequest {
    IllustrationRequest::new(prompts::render(prompts::ILLUSTRATION, &[("scene", scene)]))
}
