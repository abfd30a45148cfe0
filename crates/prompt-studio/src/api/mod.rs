//! Gemini API client and the service contract the editor depends on.
//!
//! The [`PromptService`] trait is the seam between the editor session and
//! the external generative service: deconstruction (raw → structured),
//! analysis (tags + rewrite candidates), variations, and image generation.
//! [`GeminiClient`] is the production implementation over the Generative
//! Language REST API; tests substitute recording stubs.

pub mod client;
pub mod retry;

pub use client::GeminiClient;
pub use retry::RetryConfig;

use crate::{AnalysisReport, PromptVariation, StructuredPrompt};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`PromptService`] methods.
///
/// Type alias to keep trait signatures and implementations readable.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// External generative-service contract.
///
/// All methods are async and fallible; errors are plain message strings that
/// the session surfaces as transient notices. Implementations must guarantee
/// that [`deconstruct`](Self::deconstruct) returns a prompt with at least one
/// subject (normalizing an empty list with
/// [`StructuredPrompt::ensure_subject_floor`]).
pub trait PromptService: Send + Sync {
    /// Infer the structured form of a raw prompt.
    fn deconstruct<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, StructuredPrompt>;

    /// Analyze a raw prompt into tags and rewrite candidates.
    fn analyze<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, AnalysisReport>;

    /// Produce creative variations of a raw prompt.
    fn variations<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, Vec<PromptVariation>>;

    /// Generate an image for a raw prompt, returning a data URL.
    ///
    /// A content-policy block is reported as an `Err` whose message contains
    /// `"blocked for safety reasons"`; the session pattern-matches that text
    /// to enrich the user-facing error.
    fn generate_image<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, String>;
}
