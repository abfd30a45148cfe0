//! Deterministic structured → raw prompt compilation.
//!
//! [`compile`] maps a [`StructuredPrompt`] to its single natural-language
//! form. It is pure and total: same input, byte-identical output, no failure
//! mode. The one non-compositional branch is the [`BLANK_CANVAS`] sentinel
//! returned when no subject has a usable name — the editor session uses that
//! exact string to reject generation requests before any network call.

use crate::StructuredPrompt;

/// Sentinel raw prompt meaning "no subjects specified".
pub const BLANK_CANVAS: &str = "A blank canvas.";

/// Compile a structured prompt into its raw natural-language form.
///
/// The output is always two sentences — `"{style}{tone}. The image depicts
/// {subjects}{action}{setting}{details}."` — unless no subject survives the
/// trimmed-name filter, in which case the [`BLANK_CANVAS`] sentinel is
/// returned regardless of every other field.
pub fn compile(prompt: &StructuredPrompt) -> String {
    let style_part = if prompt.frame.style.is_empty() {
        "An image".to_string()
    } else {
        format!("A {}", prompt.frame.style)
    };

    let tone = prompt.frame.tone.trim();
    let tone_part = if tone.is_empty() {
        String::new()
    } else {
        format!(" in a {tone} mood")
    };

    let subjects_part = prompt
        .scene
        .subjects
        .iter()
        .filter(|s| !s.name.trim().is_empty())
        .map(|s| {
            let name = s.name.trim();
            let attribute = s.attribute.trim();
            if attribute.is_empty() {
                name.to_string()
            } else {
                format!("{name} {attribute}")
            }
        })
        .collect::<Vec<_>>()
        .join(" and ");

    if subjects_part.is_empty() {
        return BLANK_CANVAS.to_string();
    }

    let action = prompt.scene.action.trim();
    let action_part = if action.is_empty() {
        String::new()
    } else {
        format!(" {action}")
    };

    let setting = prompt.context.setting.trim();
    let setting_part = if setting.is_empty() {
        String::new()
    } else {
        format!(" in {setting}")
    };

    let details = prompt.context.details.trim();
    let details_part = if details.is_empty() {
        String::new()
    } else {
        format!(". Notable details include {details}")
    };

    format!("{style_part}{tone_part}. The image depicts {subjects_part}{action_part}{setting_part}{details_part}.")
}
