//! Glossary-backed translator.

use super::{TranslationError, Translator};
use crate::config::ConfigError;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::Path;

/// Exact-match glossary keyed by target language.
///
/// JSON shape: `{ "de": { "Hello": "Hallo" } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlossaryTranslator {
    entries: BTreeMap<String, BTreeMap<String, String>>,
    strict: bool,
}

impl GlossaryTranslator {
    pub fn new(entries: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self {
            entries,
            strict: false,
        }
    }

    /// Reads a glossary JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&text)?;
        info!(
            "event=glossary_load module=translation status=ok path={} languages={}",
            path.display(),
            entries.len()
        );
        Ok(Self::new(entries))
    }

    /// In strict mode a missing entry is an error instead of a source-text fallback.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn insert(
        &mut self,
        target_language: impl Into<String>,
        source: impl Into<String>,
        translated: impl Into<String>,
    ) {
        self.entries
            .entry(target_language.into())
            .or_default()
            .insert(source.into(), translated.into());
    }
}

impl Translator for GlossaryTranslator {
    fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() || source_language == target_language {
            return Ok(text.to_string());
        }
        let hit = self
            .entries
            .get(target_language)
            .and_then(|language| language.get(text));
        match hit {
            Some(translated) => Ok(translated.clone()),
            None if self.strict => Err(TranslationError::MissingEntry {
                target_language: target_language.to_string(),
                text: text.to_string(),
            }),
            None => {
                debug!(
                    "event=translate module=translation status=skip reason=missing_entry target={target_language}"
                );
                Ok(text.to_string())
            }
        }
    }
}
