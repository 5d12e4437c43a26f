//! Variant relationship lookups.

use crate::config::{ConfigError, SyncConfig, VariantPreset};
use crate::model::variant::{TranslationStrategy, VariantId};
use std::collections::BTreeMap;

/// Resolves the default variant and each variant's strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPolicy {
    default_variant: VariantId,
    presets: BTreeMap<VariantId, VariantPreset>,
}

impl VariantPolicy {
    pub fn from_config(config: &SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let default_variant = config
            .default_variant
            .clone()
            .ok_or(ConfigError::MissingDefaultVariant)?;
        Ok(Self {
            default_variant,
            presets: config.variants.clone(),
        })
    }

    pub fn default_variant(&self) -> &VariantId {
        &self.default_variant
    }

    pub fn is_default(&self, variant: &VariantId) -> bool {
        *variant == self.default_variant
    }

    /// Strategy of one variant. Unconfigured variants have none.
    pub fn strategy(&self, variant: &VariantId) -> TranslationStrategy {
        self.presets
            .get(variant)
            .map_or(TranslationStrategy::None, |preset| {
                preset.translation_strategy
            })
    }

    /// Every non-default variant with its strategy, in identifier order.
    pub fn targets(&self) -> impl Iterator<Item = (&VariantId, TranslationStrategy)> {
        self.presets
            .iter()
            .filter(|(variant, _)| !self.is_default(variant))
            .map(|(variant, preset)| (variant, preset.translation_strategy))
    }

    /// Non-default variants that follow the default on every run.
    pub fn sync_targets(&self) -> Vec<VariantId> {
        self.targets()
            .filter(|(_, strategy)| *strategy == TranslationStrategy::Sync)
            .map(|(variant, _)| variant.clone())
            .collect()
    }

    /// Language code handed to the translator for `variant`.
    pub fn translation_language<'a>(&'a self, variant: &'a VariantId) -> &'a str {
        self.presets
            .get(variant)
            .and_then(|preset| preset.translation_language.as_deref())
            .unwrap_or(variant.as_str())
    }
}
