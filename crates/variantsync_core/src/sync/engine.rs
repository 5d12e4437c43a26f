//! Per-node sync decision and fan-out to target variants.
//!
//! # Responsibility
//! - Gate nodes by type option and source variant.
//! - Adopt and translate into every sync-strategy variant, or propagate removal.
//!
//! # Invariants
//! - Only nodes observed in the default variant act as sources.
//! - Variants without the `sync` strategy are never written.
//! - Fan-out is fail-fast per node: the first failing target aborts the rest.
//! - Re-running on an unchanged source produces no writes.

use crate::config::{ContentTypeGate, VariantPolicy};
use crate::model::node::{Node, NodeScope};
use crate::model::variant::{TranslationStrategy, VariantId};
use crate::repo::node_repo::NodeRepository;
use crate::sync::context::VariantContext;
use crate::sync::error::{SyncError, SyncResult};
use crate::translation::Translator;
use log::{debug, trace};
use std::collections::BTreeMap;

/// Outcome of the sync decision for one (node, target variant) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// The node type opted out of automatic sync.
    SkipTypeOptedOut,
    /// The node was not observed in the default variant.
    SkipNotDefaultVariant,
    /// The target variant does not use the `sync` strategy.
    SkipStrategy,
    /// Adopt and translate into the target.
    Propagate,
    /// Tombstone the target counterpart, if any.
    PropagateRemoval,
}

impl SyncDecision {
    pub fn is_skip(self) -> bool {
        matches!(
            self,
            Self::SkipTypeOptedOut | Self::SkipNotDefaultVariant | Self::SkipStrategy
        )
    }
}

/// Propagates default-variant nodes into target variant contexts.
pub struct SyncEngine<'a, R: NodeRepository + ?Sized, T: Translator + ?Sized> {
    repo: &'a R,
    policy: &'a VariantPolicy,
    gate: &'a ContentTypeGate,
    translator: &'a T,
    workspace: String,
    contexts: BTreeMap<VariantId, VariantContext<'a, R>>,
}

impl<'a, R: NodeRepository + ?Sized, T: Translator + ?Sized> SyncEngine<'a, R, T> {
    pub fn new(
        repo: &'a R,
        policy: &'a VariantPolicy,
        gate: &'a ContentTypeGate,
        translator: &'a T,
        workspace: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            policy,
            gate,
            translator,
            workspace: workspace.into(),
            contexts: BTreeMap::new(),
        }
    }

    /// Fresh context bound to the default variant; walks start here.
    pub fn default_context(&self) -> VariantContext<'a, R> {
        self.bind(self.policy.default_variant().clone())
    }

    /// Returns the cached context for `variant`, creating it on first use.
    pub fn context_for(&mut self, variant: &VariantId) -> &VariantContext<'a, R> {
        if !self.contexts.contains_key(variant) {
            let context = self.bind(variant.clone());
            self.contexts.insert(variant.clone(), context);
        }
        &self.contexts[variant]
    }

    /// Decides what `sync` does for `node` against `target`, without side effects.
    pub fn decide(&self, node: &Node, target: &VariantId) -> SyncDecision {
        if !self.gate.is_automatic_sync_enabled(&node.node_type) {
            return SyncDecision::SkipTypeOptedOut;
        }
        if !self.policy.is_default(node.variant()) {
            return SyncDecision::SkipNotDefaultVariant;
        }
        if self.policy.is_default(target)
            || self.policy.strategy(target) != TranslationStrategy::Sync
        {
            return SyncDecision::SkipStrategy;
        }
        if node.is_removed() {
            SyncDecision::PropagateRemoval
        } else {
            SyncDecision::Propagate
        }
    }

    /// Synchronizes one node into every non-default variant.
    ///
    /// Returns the decision taken per target, in variant order.
    pub fn sync(
        &mut self,
        node: &Node,
        translate: bool,
    ) -> SyncResult<Vec<(VariantId, SyncDecision)>> {
        let targets: Vec<VariantId> = self
            .policy
            .targets()
            .map(|(variant, _)| variant.clone())
            .collect();

        let mut decisions = Vec::with_capacity(targets.len());
        for target in targets {
            let decision = self.decide(node, &target);
            match decision {
                SyncDecision::Propagate => self.propagate(node, &target, translate)?,
                SyncDecision::PropagateRemoval => self.propagate_removal(node, &target)?,
                _ => {}
            }
            trace!(
                "event=node_sync module=sync node_id={} path={} target={target} decision={decision:?}",
                node.aggregate_id, node.path
            );
            decisions.push((target, decision));
        }
        Ok(decisions)
    }

    fn propagate(&mut self, node: &Node, target: &VariantId, translate: bool) -> SyncResult<()> {
        let gate = self.gate;
        let translator = self.translator;
        let source_language = self.policy.translation_language(node.variant()).to_string();
        let context = self.context_for(target);

        let counterpart = context
            .adopt_node(node, gate)
            .map_err(|err| SyncError::Adoption {
                node_id: node.aggregate_id,
                variant: target.clone(),
                source: err,
            })?;
        context.translate_node(
            node,
            counterpart,
            &source_language,
            gate,
            translator,
            translate,
        )?;
        Ok(())
    }

    fn propagate_removal(&mut self, node: &Node, target: &VariantId) -> SyncResult<()> {
        let context = self.context_for(target);
        let Some(mut counterpart) = context.get_node_by_identifier(node.aggregate_id)? else {
            return Ok(());
        };
        let changed = context
            .set_removed(&mut counterpart, true)
            .map_err(|err| SyncError::Write {
                node_id: node.aggregate_id,
                variant: target.clone(),
                source: err,
            })?;
        if changed {
            debug!(
                "event=node_remove module=sync status=ok target={target} node_id={} path={}",
                node.aggregate_id, counterpart.path
            );
        }
        Ok(())
    }

    fn bind(&self, variant: VariantId) -> VariantContext<'a, R> {
        let language = self.policy.translation_language(&variant).to_string();
        VariantContext::new(
            self.repo,
            NodeScope::new(self.workspace.clone(), variant),
            language,
        )
    }
}
