//! Async HTTP client for the Gemini generative API.
//!
//! Structured-output calls (deconstruction, analysis, variations) go through
//! `generateContent` with a `responseSchema` generated from the target Rust
//! type via [`json_schema_for`]; the response text is validated against the
//! same schema before deserialization. Image generation goes through the
//! Imagen `:predict` endpoint and returns a `data:` URL.

use crate::api::retry::{RetryConfig, is_transient_error};
use crate::api::{PromptService, ServiceFuture};
use crate::{
    AnalysisReport, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL, GEMINI_API_URL, PromptVariation,
    StructuredPrompt, json_schema_for,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── System instructions ────────────────────────────────────────────

const DECONSTRUCT_INSTRUCTION: &str = "You are an expert at analyzing image generation prompts. \
     Your task is to deconstruct a user-provided prompt into a structured JSON format based on \
     Systemic Functional Linguistics (SFL) principles. Adhere strictly to the provided JSON \
     schema. If a field is not present in the prompt, provide a reasonable empty or default value.";

const ANALYZE_INSTRUCTION: &str = "You are a prompt analysis expert specializing in identifying \
     sensitive content and improving prompts for image generation. Analyze the user's prompt \
     based on Systemic Functional Linguistics (SFL) principles, identifying entities, processes, \
     and potential policy risks. Then, generate several alternative prompts that are safer, more \
     creative, or stylistically different. Adhere strictly to the provided JSON schema.";

const VARIATIONS_INSTRUCTION: &str = "You are a creative assistant for an image generation tool. \
     Given a prompt, your job is to generate 3-4 distinct and creative variations. The variations \
     should explore different artistic styles, moods, compositions, or subject interpretations \
     while retaining the core subject matter. Adhere strictly to the provided JSON schema.";

/// Error message for an empty Imagen response. The session matches on the
/// "blocked for safety reasons" substring to append its remediation hint.
const NO_IMAGE_ERROR: &str = "No image was generated. The prompt may have been blocked for \
     safety reasons. Please adjust your prompt.";

// ── Request types ──────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Serialize, Debug)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Serialize, Debug)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

// ── Response types ─────────────────────────────────────────────────

/// Raw `generateContent` response (internal deserialization target).
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawGenerateResponse {
    candidates: Option<Vec<RawCandidate>>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct RawCandidate {
    content: Option<RawContent>,
}

#[derive(Deserialize, Debug)]
struct RawContent {
    parts: Option<Vec<RawPart>>,
}

#[derive(Deserialize, Debug)]
struct RawPart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

#[derive(Deserialize, Debug)]
struct RawPredictResponse {
    predictions: Option<Vec<RawPrediction>>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawPrediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

/// Wire envelope for the variations call — Gemini structured output must be
/// a JSON object, so the list is wrapped.
#[derive(Deserialize, JsonSchema)]
struct VariationEnvelope {
    /// A list of 3-4 creative prompt variations.
    variations: Vec<PromptVariation>,
}

// ── Response extraction (pure, testable) ───────────────────────────

/// Extract the first candidate's concatenated text from a `generateContent`
/// response body, surfacing API errors and safety blocks as messages.
fn extract_text(body: &str) -> Result<String, String> {
    let parsed: RawGenerateResponse =
        serde_json::from_str(body).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("Gemini API error: {}", err.message));
    }

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(format!("Prompt was blocked by the API: {reason}"));
    }

    let text: String = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .map(|parts| {
            parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err("Empty model response".to_string());
    }
    Ok(text)
}

/// Extract the first prediction from an Imagen `:predict` response body as a
/// `data:` URL. An empty prediction list maps to the safety-block message.
fn extract_image(body: &str) -> Result<String, String> {
    let parsed: RawPredictResponse =
        serde_json::from_str(body).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("Gemini API error: {}", err.message));
    }

    let prediction = parsed
        .predictions
        .and_then(|p| p.into_iter().next())
        .ok_or_else(|| NO_IMAGE_ERROR.to_string())?;

    match prediction.bytes_base64_encoded {
        Some(bytes) => {
            let mime = prediction.mime_type.as_deref().unwrap_or("image/jpeg");
            Ok(format!("data:{mime};base64,{bytes}"))
        }
        None => Err(NO_IMAGE_ERROR.to_string()),
    }
}

/// Validate a JSON value against a schema, returning the first few errors.
///
/// A schema that itself fails to compile skips validation rather than
/// failing the call.
fn validate_against_schema(schema: &serde_json::Value, value: &serde_json::Value) -> Result<(), String> {
    let validator = match jsonschema::validator_for(schema) {
        Ok(v) => v,
        Err(_) => return Ok(()),
    };

    let errors: Vec<String> = validator
        .iter_errors(value)
        .take(3)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "response does not match schema: {}",
            errors.join("; ")
        ))
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the Gemini generative API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    retry: RetryConfig,
}

impl GeminiClient {
    /// Create a new client with the given API key and default models.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .user_agent("prompt-studio/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Override the API base URL (useful for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the text model used for structured-output calls.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Override the image model used for generation.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Enable automatic retries for transient API failures (429, 5xx, quota,
    /// network errors). Uses exponential backoff with jitter.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry = RetryConfig::with_retries(max_retries);
        self
    }

    /// POST a JSON body and return the response text, retrying transient
    /// failures per the retry config.
    async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<String, String> {
        let mut attempt = 0;
        loop {
            match self.post_json_once(url, body).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.retry.max_retries && is_transient_error(&e) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        "transient API failure (attempt {}/{}), retrying in {:.1}s: {e}",
                        attempt + 1,
                        self.retry.max_retries,
                        delay.as_secs_f64(),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_json_once<B: Serialize>(&self, url: &str, body: &B) -> Result<String, String> {
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );
        let start = Instant::now();

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "Gemini response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("Gemini API HTTP {status}: {text}"));
        }
        Ok(text)
    }

    /// Run a structured-output `generateContent` call: the response schema is
    /// generated from `T`, the reply is validated against it, then parsed.
    async fn structured_call<T>(&self, instruction: &str, user_text: &str) -> Result<T, String>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = json_schema_for::<T>();
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.text_model
        );
        let request = GenerateContentRequest {
            contents: vec![Content::text(user_text)],
            system_instruction: Some(Content::text(instruction)),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            }),
        };

        debug!("structured call: model={}, user chars={}", self.text_model, user_text.len());

        let body = self.post_json(&url, &request).await?;
        let text = extract_text(&body)?;

        let value: serde_json::Value = serde_json::from_str(text.trim())
            .map_err(|e| format!("failed to parse structured output: {e}"))?;
        validate_against_schema(&schema, &value)?;

        serde_json::from_value(value).map_err(|e| format!("failed to decode structured output: {e}"))
    }

    /// Infer the structured form of a raw prompt.
    pub async fn deconstruct_prompt(&self, raw_prompt: &str) -> Result<StructuredPrompt, String> {
        let user = format!("Deconstruct the following image generation prompt: \"{raw_prompt}\"");
        let mut prompt: StructuredPrompt =
            self.structured_call(DECONSTRUCT_INSTRUCTION, &user).await?;
        // The model occasionally returns an empty subject list.
        prompt.ensure_subject_floor();
        Ok(prompt)
    }

    /// Analyze a raw prompt into tags and rewrite candidates.
    pub async fn analyze_prompt(&self, raw_prompt: &str) -> Result<AnalysisReport, String> {
        let user = format!("Analyze and rewrite the following prompt: \"{raw_prompt}\"");
        self.structured_call(ANALYZE_INSTRUCTION, &user).await
    }

    /// Produce creative variations of a raw prompt.
    pub async fn variation_prompts(&self, raw_prompt: &str) -> Result<Vec<PromptVariation>, String> {
        let user = format!("Generate creative variations for this image prompt: \"{raw_prompt}\"");
        let envelope: VariationEnvelope =
            self.structured_call(VARIATIONS_INSTRUCTION, &user).await?;
        Ok(envelope.variations)
    }

    /// Generate an image for a raw prompt, returning a `data:` URL.
    pub async fn generate_image_url(&self, raw_prompt: &str) -> Result<String, String> {
        let url = format!("{}/models/{}:predict", self.base_url, self.image_model);
        let request = PredictRequest {
            instances: vec![PredictInstance { prompt: raw_prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "1:1".to_string(),
                output_mime_type: "image/jpeg".to_string(),
            },
        };

        debug!("image call: model={}, prompt chars={}", self.image_model, raw_prompt.len());

        let body = self.post_json(&url, &request).await?;
        extract_image(&body)
    }
}

impl PromptService for GeminiClient {
    fn deconstruct<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, StructuredPrompt> {
        Box::pin(self.deconstruct_prompt(raw_prompt))
    }

    fn analyze<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, AnalysisReport> {
        Box::pin(self.analyze_prompt(raw_prompt))
    }

    fn variations<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, Vec<PromptVariation>> {
        Box::pin(self.variation_prompts(raw_prompt))
    }

    fn generate_image<'a>(&'a self, raw_prompt: &'a str) -> ServiceFuture<'a, String> {
        Box::pin(self.generate_image_url(raw_prompt))
    }
}
