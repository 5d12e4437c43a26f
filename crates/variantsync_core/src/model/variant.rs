//! Variant identifiers and translation strategy.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of one language variant, e.g. `en` or `de`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VariantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How a non-default variant follows the default variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStrategy {
    /// Structure and content are propagated on every sync run.
    Sync,
    /// No relationship to the default variant.
    #[default]
    None,
    /// Editors maintain the variant by hand. Unknown strategy values land here.
    // `serde(other)` must stay on the last variant.
    #[serde(other)]
    Manual,
}

impl TranslationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Manual => "manual",
            Self::None => "none",
        }
    }
}
