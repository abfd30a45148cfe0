//! Structured prompt workbench for image generation.
//!
//! `prompt-studio` maintains an image-generation prompt in two synchronized
//! forms: a **structured** form ([`StructuredPrompt`] — frame, scene,
//! context) and a **raw** natural-language string. The structured form is
//! compiled to the raw form by a deterministic pure function
//! ([`compiler::compile`]); the reverse direction goes through the Gemini
//! deconstruction service. Edits to the structured form are tracked in a
//! generic undo/redo container ([`history::HistoryState`]), and an editor
//! session ([`editor::Session`]) orchestrates analysis, rewrite, variation,
//! and image-generation calls around the pair.
//!
//! # Getting started
//!
//! ```ignore
//! use prompt_studio::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let api_key = std::env::var("GEMINI_API_KEY").unwrap();
//!     let client = GeminiClient::new(api_key)?;
//!     let favorites = FavoritesStore::new(".prompt-studio/favorites.json")?;
//!
//!     let mut session = Session::new(client, favorites, "A lone astronaut on Mars.");
//!     session.init().await;
//!     session.generate().await;
//!
//!     if let Some(item) = session.generations().first() {
//!         println!("{}", item.raw_prompt);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`compiler`] | Deterministic structured → raw prompt compilation |
//! | [`history`] | Generic undo/redo state container with branch truncation |
//! | [`api`] | [`GeminiClient`](api::GeminiClient), the [`PromptService`](api::PromptService) contract, retry policy |
//! | [`editor`] | [`Session`](editor::Session) controller and the file-backed favorites store |

pub mod api;
pub mod compiler;
pub mod editor;
pub mod history;
pub mod prelude;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Constants ──────────────────────────────────────────────────────

/// Base URL of the Google Generative Language REST API.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for deconstruction, analysis, and variation calls.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for image generation.
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. This is the bridge between strong Rust types and
/// the `responseSchema` field of Gemini structured-output requests.
///
/// Subschemas are inlined because the Gemini API does not resolve `$ref`
/// pointers, and the meta-schema annotation is dropped for the same reason.
///
/// # Example
///
/// ```
/// use prompt_studio::{StructuredPrompt, json_schema_for};
///
/// let schema = json_schema_for::<StructuredPrompt>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"scene".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let mut settings = schemars::r#gen::SchemaSettings::draft07();
    settings.inline_subschemas = true;
    settings.meta_schema = None;
    let schema = settings.into_generator().into_root_schema_for::<T>();
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Structured prompt model ────────────────────────────────────────

/// One actor or object in the scene.
///
/// Duplicates are permitted; the list in [`Scene`] is ordered and never
/// shorter than one entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Subject {
    /// The name of the subject. E.g., 'a robot', 'a senator'.
    pub name: String,
    /// How the subject is portrayed or their role. E.g., 'as a petulant child', 'with a jetpack'.
    pub attribute: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
        }
    }

    /// A subject with empty name and attribute — the placeholder the editor
    /// starts from and the floor value substituted for empty service results.
    pub fn blank() -> Self {
        Self::new("", "")
    }
}

/// Artistic framing of the image: overall style and mood.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Frame {
    /// The overall artistic style, genre, or medium. E.g., 'Photorealistic photo', '3D render', 'Political cartoon'.
    pub style: String,
    /// A comma-separated list of tags describing the mood, tone, or feeling. E.g., 'Satirical, Humorous', 'Epic, Somber'.
    pub tone: String,
}

/// What happens in the image: who is in it and what they do.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Scene {
    /// A list of the main subjects or characters.
    pub subjects: Vec<Subject>,
    /// The primary action or process taking place. E.g., 'is disciplining', 'sits on a throne'.
    pub action: String,
}

/// Where the scene takes place and its notable details.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct SceneContext {
    /// The location or setting of the scene. E.g., 'on the White House lawn', 'in a cyberpunk city'.
    pub setting: String,
    /// A comma-separated list of key objects, props, or other important details. E.g., 'a broken gavel', 'lens flare'.
    pub details: String,
}

/// The structured form of an image-generation prompt.
///
/// All leaf fields are strings; the empty string is the canonical "unset"
/// value. Invariant: `scene.subjects` holds at least one entry at all times
/// after construction — [`remove_subject`](Self::remove_subject) refuses to
/// drop below the floor, and [`ensure_subject_floor`](Self::ensure_subject_floor)
/// restores it for values coming back from the deconstruction service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct StructuredPrompt {
    pub frame: Frame,
    pub scene: Scene,
    pub context: SceneContext,
}

impl StructuredPrompt {
    /// The all-empty prompt: no style, no tone, a single blank subject.
    pub fn blank() -> Self {
        Self {
            frame: Frame {
                style: String::new(),
                tone: String::new(),
            },
            scene: Scene {
                subjects: vec![Subject::blank()],
                action: String::new(),
            },
            context: SceneContext {
                setting: String::new(),
                details: String::new(),
            },
        }
    }

    /// Append a subject to the scene.
    pub fn push_subject(&mut self, subject: Subject) {
        self.scene.subjects.push(subject);
    }

    /// Remove the subject at `index`. Returns `false` without mutating when
    /// the index is out of range or when removal would leave the scene with
    /// no subjects.
    pub fn remove_subject(&mut self, index: usize) -> bool {
        if self.scene.subjects.len() <= 1 || index >= self.scene.subjects.len() {
            return false;
        }
        self.scene.subjects.remove(index);
        true
    }

    /// Restore the subject floor: if the subject list is empty (a state the
    /// deconstruction service can produce), substitute a single blank subject.
    pub fn ensure_subject_floor(&mut self) {
        if self.scene.subjects.is_empty() {
            self.scene.subjects.push(Subject::blank());
        }
    }
}

impl Default for StructuredPrompt {
    fn default() -> Self {
        Self::blank()
    }
}

// ── Analysis result records ────────────────────────────────────────

/// Category of an analysis tag.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisCategory {
    Entity,
    Process,
    Tone,
    Risk,
    Other,
}

/// One tag produced by the analysis service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AnalysisTag {
    /// A unique ID for the tag, e.g., 'ent-1'.
    pub id: String,
    /// The tag category: 'entity', 'process', 'tone', 'risk', or 'other'.
    pub category: AnalysisCategory,
    /// The specific text from the prompt being analyzed.
    pub span: String,
    /// A brief explanation of the analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A severity score from 0.0 to 1.0, especially for risks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// One suggested rewrite of the prompt.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct RewriteCandidate {
    /// A unique ID for the candidate, e.g., 'rewrite-1'.
    pub id: String,
    /// A short, descriptive title for the rewrite.
    pub title: String,
    /// The full text of the rewritten prompt.
    pub text: String,
    /// The reason this rewrite is being suggested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// A confidence score from 0.0 to 1.0 for the quality of the rewrite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Combined result of one analysis call: tags plus rewrite candidates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AnalysisReport {
    /// A list of tags analyzing the prompt's components.
    pub analysis: Vec<AnalysisTag>,
    /// A list of suggested rewrite candidates for the prompt.
    pub candidates: Vec<RewriteCandidate>,
}

/// One creative variation of the prompt.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PromptVariation {
    /// A unique ID for the variation, e.g., 'var-1'.
    pub id: String,
    /// A short, descriptive title for the variation, highlighting the change.
    pub title: String,
    /// The full text of the prompt variation.
    pub prompt: String,
}

// ── Session records ────────────────────────────────────────────────

/// An immutable record of one successful image generation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationHistoryItem {
    pub id: String,
    /// Data URL of the generated image (`data:image/jpeg;base64,...`).
    pub image_url: String,
    /// Structured form of the prompt at generation time.
    pub prompt: StructuredPrompt,
    /// The exact raw prompt text sent to the image model.
    pub raw_prompt: String,
}

impl GenerationHistoryItem {
    pub fn new(
        image_url: impl Into<String>,
        prompt: StructuredPrompt,
        raw_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: record_id(),
            image_url: image_url.into(),
            prompt,
            raw_prompt: raw_prompt.into(),
        }
    }
}

/// A user-persisted favorite prompt.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavedPromptItem {
    pub id: String,
    /// Display name derived from the first few words of the raw prompt.
    pub name: String,
    pub raw_prompt: String,
    pub prompt: StructuredPrompt,
}

impl SavedPromptItem {
    pub fn new(
        name: impl Into<String>,
        raw_prompt: impl Into<String>,
        prompt: StructuredPrompt,
    ) -> Self {
        Self {
            id: record_id(),
            name: name.into(),
            raw_prompt: raw_prompt.into(),
            prompt,
        }
    }

    /// Derive a short display name from a raw prompt: its first five words,
    /// with an ellipsis when there are more.
    pub fn derived_name(raw_prompt: &str) -> String {
        let words: Vec<&str> = raw_prompt.split_whitespace().collect();
        if words.len() > 5 {
            format!("{}...", words[..5].join(" "))
        } else {
            words.join(" ")
        }
    }
}

/// RFC 3339 timestamp used as a record identifier.
fn record_id() -> String {
    chrono::Utc::now().to_rfc3339()
}
