//! Text translation capability injected into the sync engine.
//!
//! # Responsibility
//! - Define the `Translator` seam; the engine never knows how text is translated.
//! - Ship a glossary-backed translator for offline runs.
//!
//! # Invariants
//! - Translators are only invoked for translate-enabled sync runs.
//! - A translator error never writes partial field updates.

mod glossary;

pub use glossary::GlossaryTranslator;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Translation failures surfaced to the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// No translation is known for `text` in `target_language`.
    MissingEntry {
        target_language: String,
        text: String,
    },
    /// Upstream translation backend failed.
    Backend(String),
}

impl Display for TranslationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEntry {
                target_language,
                text,
            } => write!(f, "no `{target_language}` translation for `{text}`"),
            Self::Backend(message) => write!(f, "translation backend failed: {message}"),
        }
    }
}

impl Error for TranslationError {}

/// Maps source text to target-language text.
pub trait Translator {
    fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslationError>;
}
