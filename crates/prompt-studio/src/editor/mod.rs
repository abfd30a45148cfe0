//! The editor: session controller and favorites persistence.
//!
//! [`Session`] is the application's state machine — it owns the structured
//! and raw prompt pair, the generation history, analysis results, and
//! transient notices, and drives all service calls. [`FavoritesStore`] keeps
//! saved prompts on disk across restarts.

pub mod favorites;
pub mod session;

pub use favorites::FavoritesStore;
pub use session::{NOTICE_TTL, Session, SessionPhase};
