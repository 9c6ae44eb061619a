pub const SYSTEM: &str = include_str!("../data/prompts/system.txt");
pub const IMAGE_INTRO: &str = include_str!("../data/prompts/image_intro.txt");
pub const CLOSING: &str = include_str!("../data/prompts/closing.txt");
pub const TEXT_ONLY_NOTE: &str = include_str!("../data/prompts/text_only_note.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
