//! Presentation of a finished story book as Markdown and JSON files.

use crate::models::{Illustration, StoryBook};
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const UNAVAILABLE_TEXT: &str = "Illustration unavailable for this scene.";

pub fn to_markdown(book: &StoryBook) -> String {
    let mut out = format!("# {}\n\n", book.title);

    for scene in &book.scenes {
        out.push_str(&format!("{}\n\n", scene.text));
        let figure = match &scene.illustration {
            Illustration::Url { url } => format!("![Scene {}]({})", scene.index + 1, url),
            Illustration::File { path } => format!("![Scene {}]({})", scene.index + 1, path),
            Illustration::Unavailable { reason } => {
                format!("_{}_ <!-- {} -->", UNAVAILABLE_TEXT, reason)
            }
        };
        out.push_str(&figure);
        out.push_str("\n\n");
    }

    out.push_str("---\nStoryNest - AI-Powered Personalized Storytelling\n");
    out
}

/// Write `story.md` and `story.json` into `dir`, returning the Markdown path.
pub fn write_story_book(book: &StoryBook, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let markdown_path = dir.join("story.md");
    fs::write(&markdown_path, to_markdown(book))?;

    let json_path = dir.join("story.json");
    fs::write(&json_path, serde_json::to_string_pretty(book)?)?;

    info!(
        "Saved story locally at: {} and {}",
        markdown_path.display(),
        json_path.display()
    );
    Ok(markdown_path)
}
