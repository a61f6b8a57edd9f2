pub const STORY_SYSTEM: &str = include_str!("../data/prompts/story_system.txt");
pub const STORY_USER: &str = include_str!("../data/prompts/story_user.txt");
pub const ILLUSTRATION: &str = include_str!("../data/prompts/illustration.txt");
pub const TRANSLATION_SYSTEM: &str = include_str!("../data/prompts/translation_system.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_multiple_vars() {
        assert_eq!(
            render("{{a}} and {{b}}", &[("a", "cats"), ("b", "dogs")]),
            "cats and dogs"
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!STORY_SYSTEM.is_empty());
        assert!(!STORY_USER.is_empty());
        assert!(!ILLUSTRATION.is_empty());
        assert!(!TRANSLATION_SYSTEM.is_empty());
    }

    #[test]
    fn test_story_user_has_placeholders() {
        assert!(STORY_USER.contains("{{name}}"));
        assert!(STORY_USER.contains("{{animal}}"));
        assert!(STORY_USER.contains("{{theme}}"));
    }

    #[test]
    fn test_illustration_has_scene_placeholder() {
        assert!(ILLUSTRATION.contains("{{scene}}"));
    }

    #[test]
    fn test_translation_has_language_placeholder() {
        assert!(TRANSLATION_SYSTEM.contains("{{language}}"));
    }
}
