//! Convenience re-exports for common `prompt-studio` types.
//!
//! Meant to be glob-imported when building on the editor:
//!
//! ```ignore
//! use prompt_studio::prelude::*;
//! ```
//!
//! This pulls in the types needed for the vast majority of programs: the
//! structured prompt model, the compiler, the [`Session`] controller with
//! its service contract, and the favorites store. Specialized types (retry
//! configuration, wire-level request records) are intentionally excluded —
//! import those from their modules directly when needed.

// ── Prompt model ────────────────────────────────────────────────────
pub use crate::{
    AnalysisCategory, AnalysisReport, AnalysisTag, Frame, GenerationHistoryItem, PromptVariation,
    RewriteCandidate, SavedPromptItem, Scene, SceneContext, StructuredPrompt, Subject,
    json_schema_for,
};

// ── Compilation ─────────────────────────────────────────────────────
pub use crate::compiler::{BLANK_CANVAS, compile};

// ── History ─────────────────────────────────────────────────────────
pub use crate::history::HistoryState;

// ── Services ────────────────────────────────────────────────────────
pub use crate::api::{GeminiClient, PromptService, ServiceFuture};

// ── Editor ──────────────────────────────────────────────────────────
pub use crate::editor::{FavoritesStore, Session, SessionPhase};
