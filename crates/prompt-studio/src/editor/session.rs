//! Editor session: the controller around the prompt pair.
//!
//! [`Session`] owns the structured prompt (inside a
//! [`HistoryState`](crate::history::HistoryState)), the raw prompt string,
//! the generation history, analysis state, variations, and the favorites
//! store, and orchestrates calls to a [`PromptService`].
//!
//! Synchronization is asymmetric: every committed structured-state
//! transition (edit, undo, redo, reset) immediately recompiles the raw
//! prompt, while raw → structured only happens through an explicit
//! deconstruction call. Jump operations (selecting a generation, loading a
//! favorite, picking a variation) reset the history wholesale; their stored
//! raw text survives only when the reset was a no-op, otherwise the
//! recompile fires like any other transition.
//!
//! All failures surface as transient notices that expire after
//! [`NOTICE_TTL`]; no operation panics or leaves the session busy. Methods
//! take `&mut self`, so two state-changing operations can never be in
//! flight at once — the interleaving races the browser original tolerated
//! cannot occur here.

use crate::api::PromptService;
use crate::compiler::{BLANK_CANVAS, compile};
use crate::editor::favorites::FavoritesStore;
use crate::history::HistoryState;
use crate::{
    AnalysisReport, AnalysisTag, GenerationHistoryItem, PromptVariation, RewriteCandidate,
    SavedPromptItem, StructuredPrompt,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a notice stays visible before auto-dismissal.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Substring identifying a content-policy block in a service error.
const SAFETY_BLOCK_MARKER: &str = "blocked for safety reasons";

/// Hint appended to safety-block errors, pointing at the rewrite feature.
const SAFETY_BLOCK_HINT: &str = " Review the analysis for safer rewrite suggestions.";

// ── Phase and notices ──────────────────────────────────────────────

/// What the session is currently busy with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Analyzing,
    Generating,
    Loading,
}

impl SessionPhase {
    /// Display label for the generate button, as the editor shows it.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Generate",
            Self::Analyzing => "Analyzing...",
            Self::Generating => "Generating...",
            Self::Loading => "Loading...",
        }
    }

    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }
}

/// A transient user-visible message (validation error or service failure).
#[derive(Debug, Clone)]
struct Notice {
    message: String,
    raised_at: Instant,
}

// ── Session ────────────────────────────────────────────────────────

/// The editor controller. Generic over the service so tests can substitute
/// a recording stub for the Gemini client.
pub struct Session<S> {
    service: S,
    favorites: FavoritesStore,

    prompt: HistoryState<StructuredPrompt>,
    raw_prompt: String,

    generations: Vec<GenerationHistoryItem>,
    selected_generation: usize,

    analysis: Vec<AnalysisTag>,
    candidates: Vec<RewriteCandidate>,
    selected_candidate: Option<String>,
    variations: Vec<PromptVariation>,

    phase: SessionPhase,
    generating_variations: bool,
    notice: Option<Notice>,
    notice_ttl: Duration,
}

impl<S: PromptService> Session<S> {
    /// Create a session starting from a blank structured prompt and the
    /// given raw prompt text. Call [`init`](Self::init) to derive the
    /// structured form from the raw text.
    pub fn new(service: S, favorites: FavoritesStore, initial_raw: impl Into<String>) -> Self {
        Self {
            service,
            favorites,
            prompt: HistoryState::new(StructuredPrompt::blank()),
            raw_prompt: initial_raw.into(),
            generations: Vec::new(),
            selected_generation: 0,
            analysis: Vec::new(),
            candidates: Vec::new(),
            selected_candidate: None,
            variations: Vec::new(),
            phase: SessionPhase::Idle,
            generating_variations: false,
            notice: None,
            notice_ttl: NOTICE_TTL,
        }
    }

    /// Override the notice lifetime (tests use a zero TTL to observe expiry).
    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn prompt(&self) -> &StructuredPrompt {
        self.prompt.state()
    }

    pub fn raw_prompt(&self) -> &str {
        &self.raw_prompt
    }

    pub fn can_undo(&self) -> bool {
        self.prompt.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.prompt.can_redo()
    }

    /// Generation history, most recent first.
    pub fn generations(&self) -> &[GenerationHistoryItem] {
        &self.generations
    }

    pub fn selected_generation(&self) -> usize {
        self.selected_generation
    }

    /// Image data URL of the currently selected generation, if any.
    pub fn current_image_url(&self) -> Option<&str> {
        self.generations
            .get(self.selected_generation)
            .map(|item| item.image_url.as_str())
    }

    pub fn analysis(&self) -> &[AnalysisTag] {
        &self.analysis
    }

    pub fn candidates(&self) -> &[RewriteCandidate] {
        &self.candidates
    }

    pub fn selected_candidate(&self) -> Option<&str> {
        self.selected_candidate.as_deref()
    }

    pub fn variations(&self) -> &[PromptVariation] {
        &self.variations
    }

    pub fn is_generating_variations(&self) -> bool {
        self.generating_variations
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The active notice, or `None` once it has expired.
    pub fn notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| n.raised_at.elapsed() < self.notice_ttl)
            .map(|n| n.message.as_str())
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // ── Structured/raw synchronization ─────────────────────────────

    /// Commit a structured edit. Returns whether a new snapshot was
    /// recorded; the raw prompt is recompiled on every committed change.
    pub fn edit_prompt(&mut self, f: impl FnOnce(&StructuredPrompt) -> StructuredPrompt) -> bool {
        let changed = self.prompt.set_with(f);
        if changed {
            self.sync_raw();
        }
        changed
    }

    /// Step back one structured snapshot, recompiling the raw prompt.
    pub fn undo(&mut self) -> bool {
        let moved = self.prompt.undo();
        if moved {
            self.sync_raw();
        }
        moved
    }

    /// Step forward one structured snapshot, recompiling the raw prompt.
    pub fn redo(&mut self) -> bool {
        let moved = self.prompt.redo();
        if moved {
            self.sync_raw();
        }
        moved
    }

    /// Direct raw-prompt edit. Does not touch the structured form — the
    /// reverse derivation requires an explicit deconstruction.
    pub fn set_raw_prompt(&mut self, text: impl Into<String>) {
        self.raw_prompt = text.into();
    }

    fn sync_raw(&mut self) {
        self.raw_prompt = compile(self.prompt.state());
    }

    // ── Service-backed operations ──────────────────────────────────

    /// Derive the structured form and analysis from the current raw prompt.
    /// Used once at startup; the raw prompt is replaced with its canonical
    /// compiled form when the derived structure differs.
    pub async fn init(&mut self) {
        self.phase = SessionPhase::Analyzing;
        self.notice = None;
        let raw = self.raw_prompt.clone();

        match tokio::try_join!(self.service.deconstruct(&raw), self.service.analyze(&raw)) {
            Ok((structured, report)) => {
                if self.prompt.reset(structured) {
                    self.sync_raw();
                }
                self.apply_report(report, true);
            }
            Err(e) => self.raise_notice(e),
        }
        self.phase = SessionPhase::Idle;
    }

    /// Generate an image for the current raw prompt.
    ///
    /// Rejects locally — no service call — when the trimmed raw prompt is
    /// empty or is exactly the blank-canvas sentinel. On success the new
    /// [`GenerationHistoryItem`] is prepended and selected.
    pub async fn generate(&mut self) {
        let trimmed = self.raw_prompt.trim().to_string();
        if trimmed.is_empty() || trimmed == BLANK_CANVAS {
            self.raise_notice("Please provide a descriptive prompt to generate an image.");
            return;
        }

        self.phase = SessionPhase::Analyzing;
        self.notice = None;
        self.variations.clear();
        let raw = self.raw_prompt.clone();

        let (structured, report) =
            match tokio::try_join!(self.service.deconstruct(&raw), self.service.analyze(&raw)) {
                Ok(v) => v,
                Err(e) => return self.fail_generation(e),
            };
        if self.prompt.reset(structured.clone()) {
            self.sync_raw();
        }
        self.apply_report(report, false);

        self.phase = SessionPhase::Generating;
        match self.service.generate_image(&trimmed).await {
            Ok(image_url) => {
                debug!("generation succeeded ({} chars prompt)", trimmed.len());
                self.generations
                    .insert(0, GenerationHistoryItem::new(image_url, structured, trimmed));
                self.selected_generation = 0;
                self.phase = SessionPhase::Idle;
            }
            Err(e) => self.fail_generation(e),
        }
    }

    /// Select a rewrite candidate by id.
    pub fn select_candidate(&mut self, id: impl Into<String>) {
        self.selected_candidate = Some(id.into());
    }

    /// Apply the selected rewrite candidate: its text becomes the raw
    /// prompt and is deconstructed into a fresh structured state.
    pub async fn apply_rewrite(&mut self) {
        let Some(id) = self.selected_candidate.clone() else {
            return;
        };
        let Some(candidate) = self.candidates.iter().find(|c| c.id == id).cloned() else {
            return;
        };

        self.raw_prompt = candidate.text.clone();
        self.variations.clear();
        self.phase = SessionPhase::Analyzing;

        match self.service.deconstruct(&candidate.text).await {
            Ok(structured) => {
                if self.prompt.reset(structured) {
                    self.sync_raw();
                }
            }
            Err(e) => self.raise_notice(e),
        }
        self.phase = SessionPhase::Idle;
    }

    /// Jump to a previous generation: reset the structured history to its
    /// snapshot. The item's stored raw prompt is restored only when the
    /// reset is a no-op; an effective reset recompiles like any other
    /// structured transition.
    pub fn select_generation(&mut self, index: usize) {
        let Some(item) = self.generations.get(index).cloned() else {
            return;
        };
        self.selected_generation = index;
        self.raw_prompt = item.raw_prompt;
        if self.prompt.reset(item.prompt) {
            self.sync_raw();
        }
        self.variations.clear();
    }

    /// Save the current prompt pair as a favorite.
    pub fn save_current(&mut self) {
        let trimmed = self.raw_prompt.trim().to_string();
        if trimmed.is_empty() {
            self.raise_notice("Cannot save an empty prompt.");
            return;
        }
        if self.favorites.contains_raw(&trimmed) {
            self.raise_notice("This prompt is already saved.");
            return;
        }

        let name = SavedPromptItem::derived_name(&trimmed);
        let item = SavedPromptItem::new(name, trimmed, self.prompt.state().clone());
        if let Err(e) = self.favorites.add(item) {
            self.raise_notice(e);
        }
    }

    /// Jump to a saved favorite and refresh its analysis.
    pub async fn load_saved(&mut self, id: &str) {
        let Some(item) = self.favorites.items().iter().find(|p| p.id == id).cloned() else {
            return;
        };

        self.phase = SessionPhase::Loading;
        self.notice = None;
        self.variations.clear();
        self.raw_prompt = item.raw_prompt.clone();
        if self.prompt.reset(item.prompt) {
            self.sync_raw();
        }

        match self.service.analyze(&item.raw_prompt).await {
            Ok(report) => self.apply_report(report, true),
            Err(e) => self.raise_notice(e),
        }
        self.phase = SessionPhase::Idle;
    }

    /// Delete a saved favorite by id.
    pub fn delete_saved(&mut self, id: &str) {
        if let Err(e) = self.favorites.remove(id) {
            self.raise_notice(e);
        }
    }

    /// Request creative variations of the current raw prompt.
    pub async fn request_variations(&mut self) {
        let trimmed = self.raw_prompt.trim().to_string();
        if trimmed.is_empty() {
            self.raise_notice("Please provide a prompt to generate variations.");
            return;
        }

        self.generating_variations = true;
        self.notice = None;
        self.variations.clear();

        match self.service.variations(&trimmed).await {
            Ok(variations) => self.variations = variations,
            Err(e) => self.raise_notice(e),
        }
        self.generating_variations = false;
    }

    /// Jump to a variation: its text becomes the raw prompt and is jointly
    /// deconstructed and analyzed.
    pub async fn select_variation(&mut self, id: &str) {
        let Some(variation) = self.variations.iter().find(|v| v.id == id).cloned() else {
            return;
        };

        self.phase = SessionPhase::Loading;
        self.notice = None;
        self.raw_prompt = variation.prompt.clone();
        self.variations.clear();

        match tokio::try_join!(
            self.service.deconstruct(&variation.prompt),
            self.service.analyze(&variation.prompt),
        ) {
            Ok((structured, report)) => {
                if self.prompt.reset(structured) {
                    self.sync_raw();
                }
                self.apply_report(report, true);
            }
            Err(e) => self.raise_notice(e),
        }
        self.phase = SessionPhase::Idle;
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn apply_report(&mut self, report: AnalysisReport, select_first: bool) {
        self.analysis = report.analysis;
        self.candidates = report.candidates;
        if select_first {
            if let Some(first) = self.candidates.first() {
                self.selected_candidate = Some(first.id.clone());
            }
        }
    }

    fn raise_notice(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("notice raised: {message}");
        self.notice = Some(Notice {
            message,
            raised_at: Instant::now(),
        });
    }

    /// Generation-path failure: safety blocks get the rewrite hint appended.
    fn fail_generation(&mut self, mut message: String) {
        if message.contains(SAFETY_BLOCK_MARKER) {
            message.push_str(SAFETY_BLOCK_HINT);
        }
        self.raise_notice(message);
        self.phase = SessionPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ServiceFuture;
    use crate::{AnalysisCategory, Subject};
    use std::sync::Mutex;

    /// Recording stub service with canned responses.
    struct StubService {
        calls: Mutex<Vec<String>>,
        structured: StructuredPrompt,
        report: AnalysisReport,
        variations: Vec<PromptVariation>,
        image: Result<String, String>,
    }

    impl StubService {
        fn new() -> Self {
            let mut structured = StructuredPrompt::blank();
            structured.frame.style = "photo".into();
            structured.scene.subjects = vec![Subject::new("a cat", "")];
            Self {
                calls: Mutex::new(Vec::new()),
                structured,
                report: AnalysisReport {
                    analysis: vec![AnalysisTag {
                        id: "ent-1".into(),
                        category: AnalysisCategory::Entity,
                        span: "a cat".into(),
                        detail: None,
                        weight: None,
                    }],
                    candidates: vec![RewriteCandidate {
                        id: "rewrite-1".into(),
                        title: "Softer".into(),
                        text: "A gentle cat.".into(),
                        rationale: None,
                        score: Some(0.9),
                    }],
                },
                variations: vec![PromptVariation {
                    id: "var-1".into(),
                    title: "Noir".into(),
                    prompt: "A noir cat.".into(),
                }],
                image: Ok("data:image/jpeg;base64,QUJD".into()),
            }
        }

        fn record(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PromptService for StubService {
        fn deconstruct<'a>(&'a self, _raw: &'a str) -> ServiceFuture<'a, StructuredPrompt> {
            Box::pin(async move {
                self.record("deconstruct");
                Ok(self.structured.clone())
            })
        }

        fn analyze<'a>(&'a self, _raw: &'a str) -> ServiceFuture<'a, AnalysisReport> {
            Box::pin(async move {
                self.record("analyze");
                Ok(self.report.clone())
            })
        }

        fn variations<'a>(&'a self, _raw: &'a str) -> ServiceFuture<'a, Vec<PromptVariation>> {
            Box::pin(async move {
                self.record("variations");
                Ok(self.variations.clone())
            })
        }

        fn generate_image<'a>(&'a self, _raw: &'a str) -> ServiceFuture<'a, String> {
            Box::pin(async move {
                self.record("generate_image");
                self.image.clone()
            })
        }
    }

    // The TempDir guard keeps the favorites path alive for the test body.
    fn make_session(service: StubService) -> (Session<StubService>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let favorites = FavoritesStore::new(dir.path().join("favorites.json")).unwrap();
        let session = Session::new(service, favorites, "A lone astronaut on Mars.");
        (session, dir)
    }

    #[tokio::test]
    async fn blank_prompt_generate_rejected_without_service_call() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt(BLANK_CANVAS);

        session.generate().await;

        assert!(session.notice().unwrap().contains("descriptive prompt"));
        assert!(session.generations().is_empty());
        assert!(session.service.calls().is_empty(), "no network call made");
    }

    #[tokio::test]
    async fn empty_prompt_generate_rejected() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("   ");
        session.generate().await;
        assert!(session.notice().is_some());
        assert!(session.service.calls().is_empty());
    }

    #[tokio::test]
    async fn generate_prepends_history_and_selects_newest() {
        let (mut session, _dir) = make_session(StubService::new());
        session.generate().await;
        session.generate().await;

        assert_eq!(session.generations().len(), 2);
        assert_eq!(session.selected_generation(), 0);
        assert_eq!(
            session.current_image_url(),
            Some("data:image/jpeg;base64,QUJD")
        );
        assert_eq!(session.phase(), SessionPhase::Idle);
        // The raw prompt reflects the deconstructed structure.
        assert_eq!(session.raw_prompt(), "A photo. The image depicts a cat.");
    }

    #[tokio::test]
    async fn generate_records_trimmed_prompt() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("  a cat on a mat  ");
        session.generate().await;
        assert_eq!(session.generations()[0].raw_prompt, "a cat on a mat");
    }

    #[tokio::test]
    async fn safety_block_error_gets_rewrite_hint() {
        let mut service = StubService::new();
        service.image = Err(
            "No image was generated. The prompt may have been blocked for safety reasons. \
             Please adjust your prompt."
                .into(),
        );
        let (mut session, _dir) = make_session(service);

        session.generate().await;

        let notice = session.notice().unwrap();
        assert!(notice.ends_with("Review the analysis for safer rewrite suggestions."));
        assert!(session.generations().is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle, "busy flag cleared");
    }

    #[tokio::test]
    async fn plain_failure_gets_no_hint() {
        let mut service = StubService::new();
        service.image = Err("Gemini API HTTP 500: boom".into());
        let (mut session, _dir) = make_session(service);

        session.generate().await;

        let notice = session.notice().unwrap();
        assert!(!notice.contains("rewrite suggestions"));
    }

    #[tokio::test]
    async fn init_derives_structure_and_selects_first_candidate() {
        let (mut session, _dir) = make_session(StubService::new());
        session.init().await;

        assert_eq!(session.prompt().frame.style, "photo");
        assert_eq!(session.raw_prompt(), "A photo. The image depicts a cat.");
        assert_eq!(session.selected_candidate(), Some("rewrite-1"));
        assert_eq!(session.analysis().len(), 1);
        let calls = session.service.calls();
        assert!(calls.contains(&"deconstruct".to_string()));
        assert!(calls.contains(&"analyze".to_string()));
    }

    #[test]
    fn structured_edit_resyncs_raw_prompt() {
        let (mut session, _dir) = make_session(StubService::new());

        let changed = session.edit_prompt(|p| {
            let mut next = p.clone();
            next.scene.subjects = vec![Subject::new("a senator", "wearing a crown")];
            next
        });

        assert!(changed);
        assert_eq!(
            session.raw_prompt(),
            "An image. The image depicts a senator wearing a crown."
        );
    }

    #[test]
    fn identical_edit_is_not_recorded() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("untouched");
        assert!(!session.edit_prompt(|p| p.clone()));
        // Raw prompt untouched because nothing was committed.
        assert_eq!(session.raw_prompt(), "untouched");
        assert!(!session.can_undo());
    }

    #[test]
    fn undo_redo_traverse_and_resync() {
        let (mut session, _dir) = make_session(StubService::new());
        session.edit_prompt(|p| {
            let mut next = p.clone();
            next.scene.subjects = vec![Subject::new("a cat", "")];
            next
        });
        assert_eq!(session.raw_prompt(), "An image. The image depicts a cat.");

        assert!(session.undo());
        assert_eq!(session.raw_prompt(), BLANK_CANVAS);
        assert!(!session.undo(), "bounded at the initial snapshot");

        assert!(session.redo());
        assert_eq!(session.raw_prompt(), "An image. The image depicts a cat.");
        assert!(!session.redo());
    }

    #[test]
    fn raw_edit_leaves_structured_untouched() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("hand-written prompt");
        assert_eq!(*session.prompt(), StructuredPrompt::blank());
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn select_generation_jump_resyncs_raw() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("a cat on a mat");
        session.generate().await;

        // Diverge, then jump back.
        session.edit_prompt(|p| {
            let mut next = p.clone();
            next.scene.action = "sleeps".into();
            next
        });
        assert!(session.can_undo());

        session.select_generation(0);
        // The jump changed the structured state, so the recompile fires.
        assert_eq!(session.raw_prompt(), compile(session.prompt()));
        assert_eq!(session.raw_prompt(), "A photo. The image depicts a cat.");
        assert!(!session.can_undo(), "jump collapses in-session history");
        assert!(session.variations().is_empty());
    }

    #[tokio::test]
    async fn noop_jump_preserves_stored_raw() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("a cat on a mat");
        session.generate().await;

        // Structured state already equals the snapshot: the stored raw survives.
        session.select_generation(0);
        assert_eq!(session.raw_prompt(), "a cat on a mat");
    }

    #[test]
    fn select_generation_out_of_range_is_noop() {
        let (mut session, _dir) = make_session(StubService::new());
        session.select_generation(3);
        assert_eq!(session.selected_generation(), 0);
    }

    #[test]
    fn save_rejects_empty_and_duplicate() {
        let (mut session, _dir) = make_session(StubService::new());

        session.set_raw_prompt("  ");
        session.save_current();
        assert!(session.notice().unwrap().contains("empty"));
        session.dismiss_notice();

        session.set_raw_prompt("a cat on a mat");
        session.save_current();
        assert_eq!(session.favorites().items().len(), 1);
        assert!(session.notice().is_none());

        session.save_current();
        assert!(session.notice().unwrap().contains("already saved"));
        assert_eq!(session.favorites().items().len(), 1);
    }

    #[test]
    fn saved_name_derived_from_first_words() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("one two three four five six seven");
        session.save_current();
        assert_eq!(session.favorites().items()[0].name, "one two three four five...");

        session.set_raw_prompt("short prompt");
        session.save_current();
        assert_eq!(session.favorites().items()[0].name, "short prompt");
    }

    #[tokio::test]
    async fn load_saved_jumps_and_reanalyzes() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("a cat on a mat");
        session.save_current();
        let id = session.favorites().items()[0].id.clone();

        session.set_raw_prompt("something else entirely");
        session.load_saved(&id).await;

        // The favorite's structure equals the current state, so the stored
        // raw text survives the no-op reset.
        assert_eq!(session.raw_prompt(), "a cat on a mat");
        assert_eq!(session.selected_candidate(), Some("rewrite-1"));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.service.calls().contains(&"analyze".to_string()));
    }

    #[tokio::test]
    async fn load_saved_resyncs_when_structure_differs() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("a cat on a mat");
        session.save_current();
        let id = session.favorites().items()[0].id.clone();

        // Diverge the structured state, then load the favorite back.
        session.init().await;
        session.load_saved(&id).await;

        assert_eq!(session.raw_prompt(), compile(session.prompt()));
        assert_eq!(session.raw_prompt(), BLANK_CANVAS);
    }

    #[test]
    fn delete_saved_removes_item() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("a cat on a mat");
        session.save_current();
        let id = session.favorites().items()[0].id.clone();

        session.delete_saved(&id);
        assert!(session.favorites().items().is_empty());

        // Unknown id is a quiet no-op.
        session.delete_saved("nope");
        assert!(session.notice().is_none());
    }

    #[tokio::test]
    async fn variations_request_and_selection() {
        let (mut session, _dir) = make_session(StubService::new());
        session.request_variations().await;
        assert_eq!(session.variations().len(), 1);
        assert!(!session.is_generating_variations());

        session.select_variation("var-1").await;
        assert!(session.variations().is_empty());
        assert_eq!(session.raw_prompt(), "A photo. The image depicts a cat.");
        assert_eq!(session.selected_candidate(), Some("rewrite-1"));
    }

    #[tokio::test]
    async fn variations_rejected_for_empty_prompt() {
        let (mut session, _dir) = make_session(StubService::new());
        session.set_raw_prompt("");
        session.request_variations().await;
        assert!(session.notice().is_some());
        assert!(session.service.calls().is_empty());
    }

    #[tokio::test]
    async fn apply_rewrite_uses_selected_candidate() {
        let (mut session, _dir) = make_session(StubService::new());
        session.init().await;

        session.apply_rewrite().await;
        // Deconstruction resets the structured state; raw reflects it.
        assert_eq!(session.raw_prompt(), "A photo. The image depicts a cat.");
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn apply_rewrite_without_selection_is_noop() {
        let (mut session, _dir) = make_session(StubService::new());
        session.apply_rewrite().await;
        assert!(session.service.calls().is_empty());
    }

    #[test]
    fn notice_expires_after_ttl() {
        let (session, _dir) = make_session(StubService::new());
        let mut session = session.with_notice_ttl(Duration::ZERO);
        session.set_raw_prompt("");
        session.save_current();
        assert!(session.notice().is_none(), "zero TTL expires immediately");
    }

    #[test]
    fn phase_labels() {
        assert_eq!(SessionPhase::Idle.label(), "Generate");
        assert_eq!(SessionPhase::Analyzing.label(), "Analyzing...");
        assert_eq!(SessionPhase::Generating.label(), "Generating...");
        assert_eq!(SessionPhase::Loading.label(), "Loading...");
        assert!(!SessionPhase::Idle.is_busy());
        assert!(SessionPhase::Generating.is_busy());
    }

}
