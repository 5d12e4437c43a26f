//! Variant-bound view over the node repository.
//!
//! # Responsibility
//! - Resolve nodes within exactly one (workspace, variant) scope.
//! - Provide the adopt and translate primitives that mirror a source node.
//!
//! # Invariants
//! - Every write targets this context's scope only.
//! - Counterparts receive value copies; they never alias the source record.
//! - Writes happen only when the resulting record differs from the stored one.
//! - A translator error leaves the stored counterpart untouched.

use crate::config::ContentTypeGate;
use crate::model::node::{join_path, parent_path, Node, NodeAggregateId, NodeScope};
use crate::model::variant::VariantId;
use crate::repo::node_repo::{NodeRepoError, NodeRepoResult, NodeRepository};
use crate::sync::error::{SyncError, SyncResult};
use crate::translation::Translator;
use log::debug;
use serde_json::Value;

/// Handle bound to one variant of one workspace.
pub struct VariantContext<'r, R: NodeRepository + ?Sized> {
    repo: &'r R,
    scope: NodeScope,
    language: String,
}

impl<'r, R: NodeRepository + ?Sized> VariantContext<'r, R> {
    /// Binds a context; `language` is what the translator targets for this variant.
    pub fn new(repo: &'r R, scope: NodeScope, language: impl Into<String>) -> Self {
        Self {
            repo,
            scope,
            language: language.into(),
        }
    }

    pub fn scope(&self) -> &NodeScope {
        &self.scope
    }

    pub fn variant(&self) -> &VariantId {
        &self.scope.variant
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Looks a node up by path, tombstones included.
    pub fn get_node(&self, path: &str) -> NodeRepoResult<Option<Node>> {
        self.repo.find_by_path(&self.scope, path)
    }

    /// Looks a node up by identity, tombstones included.
    pub fn get_node_by_identifier(
        &self,
        aggregate_id: NodeAggregateId,
    ) -> NodeRepoResult<Option<Node>> {
        self.repo.find_by_identifier(&self.scope, aggregate_id)
    }

    pub fn children(&self, node: &Node) -> NodeRepoResult<Vec<Node>> {
        self.repo.list_children(&self.scope, node.aggregate_id)
    }

    /// Lists every document node below `root` in pre-order.
    ///
    /// Documents nested in documents are included; `root` itself is not.
    pub fn document_descendants(
        &self,
        root: &Node,
        gate: &ContentTypeGate,
    ) -> NodeRepoResult<Vec<Node>> {
        let mut documents = Vec::new();
        let mut stack = self.children(root)?;
        stack.reverse();
        while let Some(node) = stack.pop() {
            let mut children = self.children(&node)?;
            children.reverse();
            stack.extend(children);
            if gate.is_document(&node.node_type) {
                documents.push(node);
            }
        }
        Ok(documents)
    }

    /// Creates or refreshes the structural counterpart of `source` in this variant.
    ///
    /// - Missing ancestors are adopted first, from the source variant. Ancestors
    ///   are structure: they are adopted even when their type opted out of
    ///   automatic sync, and they are not translated.
    /// - A new counterpart starts as a full copy, translatable text included.
    /// - An existing counterpart gets type, position, tombstone and
    ///   non-translatable properties refreshed; translatable properties are kept.
    /// - A counterpart still holding `source.path` after its own source moved
    ///   away is parked first; see `vacate_path`.
    pub fn adopt_node(&self, source: &Node, gate: &ContentTypeGate) -> NodeRepoResult<Node> {
        if let Some(parent_id) = source.parent_id {
            if self.get_node_by_identifier(parent_id)?.is_none() {
                let source_parent = self
                    .repo
                    .find_by_identifier(&source.scope, parent_id)?
                    .ok_or_else(|| NodeRepoError::NodeNotFound {
                        scope: source.scope.clone(),
                        aggregate_id: parent_id,
                    })?;
                self.adopt_node(&source_parent, gate)?;
            }
        }

        let existing = self.get_node_by_identifier(source.aggregate_id)?;
        if existing
            .as_ref()
            .map_or(true, |existing| existing.path != source.path)
        {
            self.vacate_path(source)?;
        }

        let Some(existing) = existing else {
            let mut counterpart = source.clone();
            counterpart.scope = self.scope.clone();
            let created = self.repo.insert_node(&counterpart)?;
            debug!(
                "event=node_adopt module=sync status=created scope={} node_id={} path={}",
                self.scope, created.aggregate_id, created.path
            );
            return Ok(created);
        };

        let translatable = gate.translatable_properties(&source.node_type);
        let mut refreshed = existing.clone();
        refreshed.parent_id = source.parent_id;
        refreshed.path = source.path.clone();
        refreshed.node_type = source.node_type.clone();
        refreshed.sort_order = source.sort_order;
        refreshed.is_removed = source.is_removed;
        refreshed.properties.retain(|name, _| {
            translatable.contains(name) || source.properties.contains_key(name)
        });
        for (name, value) in &source.properties {
            if !translatable.contains(name) {
                refreshed.properties.insert(name.clone(), value.clone());
            }
        }

        if refreshed == existing {
            debug!(
                "event=node_adopt module=sync status=unchanged scope={} node_id={}",
                self.scope, existing.aggregate_id
            );
            return Ok(existing);
        }

        let updated = self.repo.update_node(&refreshed)?;
        debug!(
            "event=node_adopt module=sync status=refreshed scope={} node_id={} revision={}",
            self.scope, updated.aggregate_id, updated.revision
        );
        Ok(updated)
    }

    /// Moves a stale occupant off `source.path`.
    ///
    /// The occupant is parked beside its old path under its own identifier
    /// when its source, in the source variant, lives at another path now
    /// (renames and sibling swaps). The walk later moves it to its real
    /// place. Occupants without a moved source are left alone, so genuine
    /// path clashes still surface as `Conflict`.
    fn vacate_path(&self, source: &Node) -> NodeRepoResult<()> {
        let Some(occupant) = self.get_node(&source.path)? else {
            return Ok(());
        };
        if occupant.aggregate_id == source.aggregate_id {
            return Ok(());
        }
        let moved = self
            .repo
            .find_by_identifier(&source.scope, occupant.aggregate_id)?
            .is_some_and(|origin| origin.path != occupant.path);
        if !moved {
            return Ok(());
        }

        let mut parked = occupant.clone();
        parked.path = join_path(
            parent_path(&occupant.path),
            &occupant.aggregate_id.simple().to_string(),
        );
        let parked = self.repo.update_node(&parked)?;
        debug!(
            "event=node_park module=sync status=ok scope={} node_id={} from={} to={}",
            self.scope, parked.aggregate_id, occupant.path, parked.path
        );
        Ok(())
    }

    /// Copies translatable properties of `source` onto `counterpart`.
    ///
    /// With `do_translate`, every textual value goes through `translator`
    /// and overwrites the counterpart. Without it, only properties the
    /// counterpart lacks are filled with source text.
    pub fn translate_node<T: Translator + ?Sized>(
        &self,
        source: &Node,
        counterpart: Node,
        source_language: &str,
        gate: &ContentTypeGate,
        translator: &T,
        do_translate: bool,
    ) -> SyncResult<Node> {
        let mut translated = counterpart.clone();
        for name in gate.translatable_properties(&source.node_type) {
            let Some(value) = source.properties.get(&name) else {
                continue;
            };
            if do_translate {
                let next = match value.as_str() {
                    Some(text) => Value::String(
                        translator
                            .translate(text, source_language, &self.language)
                            .map_err(|err| SyncError::Translation {
                                node_id: source.aggregate_id,
                                variant: self.scope.variant.clone(),
                                source: err,
                            })?,
                    ),
                    None => value.clone(),
                };
                translated.properties.insert(name, next);
            } else if !translated.properties.contains_key(&name) {
                translated.properties.insert(name, value.clone());
            }
        }

        if translated == counterpart {
            return Ok(counterpart);
        }

        let updated = self
            .repo
            .update_node(&translated)
            .map_err(|err| SyncError::Write {
                node_id: source.aggregate_id,
                variant: self.scope.variant.clone(),
                source: err,
            })?;
        debug!(
            "event=node_translate module=sync status=ok scope={} node_id={} translated={do_translate}",
            self.scope, updated.aggregate_id
        );
        Ok(updated)
    }

    /// Persists the tombstone flag of `node`. Returns whether anything changed.
    pub fn set_removed(&self, node: &mut Node, removed: bool) -> NodeRepoResult<bool> {
        if node.is_removed() == removed {
            return Ok(false);
        }
        let mut changed = node.clone();
        changed.set_removed(removed);
        *node = self.repo.update_node(&changed)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::VariantContext;
    use crate::config::{ContentTypeGate, SyncConfig};
    use crate::db::open_db_in_memory;
    use crate::model::node::{Node, NodeScope};
    use crate::repo::node_repo::{NodeRepository, SqliteNodeRepository};

    fn gate() -> ContentTypeGate {
        let config = SyncConfig::from_json_str(
            r#"{
                "default_variant": "en",
                "variants": { "en": {}, "de": { "translation_strategy": "sync" } },
                "node_types": {
                    "Document": { "translatable_properties": ["title"] },
                    "Text": { "translatable_properties": ["text"] }
                }
            }"#,
        )
        .expect("config");
        ContentTypeGate::from_config(&config)
    }

    #[test]
    fn document_descendants_are_pre_order_and_include_nested_documents() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteNodeRepository::try_new(&conn).expect("repo");
        let scope = NodeScope::new("live", "en");

        let root = repo.insert_node(&Node::root(scope.clone(), "Document")).expect("root");
        let mut about = Node::child(&root, "about", "Document");
        about.sort_order = 0;
        let about = repo.insert_node(&about).expect("about");
        let team = repo
            .insert_node(&Node::child(&about, "team", "Document"))
            .expect("team");
        let text = repo
            .insert_node(&Node::child(&about, "intro", "Text"))
            .expect("text");
        let mut contact = Node::child(&root, "contact", "Document");
        contact.sort_order = 1;
        let contact = repo.insert_node(&contact).expect("contact");

        let context = VariantContext::new(&repo, scope, "en");
        let documents = context
            .document_descendants(&root, &gate())
            .expect("descendants");
        let paths: Vec<&str> = documents.iter().map(|node| node.path.as_str()).collect();
        assert_eq!(paths, vec![about.path.as_str(), team.path.as_str(), contact.path.as_str()]);
        assert!(!paths.contains(&text.path.as_str()));
    }

    #[test]
    fn adopt_refresh_keeps_translated_text_and_syncs_other_fields() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteNodeRepository::try_new(&conn).expect("repo");
        let en = NodeScope::new("live", "en");
        let de = en.with_variant("de".into());
        let gate = gate();

        let source = repo
            .insert_node(
                &Node::root(en, "Text")
                    .with_property("text", "Hello")
                    .with_property("layout", "wide"),
            )
            .expect("source");
        let context = VariantContext::new(&repo, de, "de");
        let mut counterpart = context.adopt_node(&source, &gate).expect("adopt");
        counterpart
            .properties
            .insert("text".to_string(), "Hallo".into());
        repo.update_node(&counterpart).expect("manual translation");

        let mut changed = source.clone();
        changed
            .properties
            .insert("layout".to_string(), "narrow".into());
        changed.properties.insert("text".to_string(), "Hi".into());
        let refreshed = context.adopt_node(&changed, &gate).expect("re-adopt");

        assert_eq!(refreshed.text_property("text"), Some("Hallo"));
        assert_eq!(refreshed.text_property("layout"), Some("narrow"));
    }

    #[test]
    fn set_removed_writes_only_on_change() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteNodeRepository::try_new(&conn).expect("repo");
        let scope = NodeScope::new("live", "de");
        let mut node = repo.insert_node(&Node::root(scope.clone(), "Text")).expect("node");
        let context = VariantContext::new(&repo, scope, "de");

        assert!(context.set_removed(&mut node, true).expect("remove"));
        assert_eq!(node.revision, 2);
        assert!(!context.set_removed(&mut node, true).expect("remove again"));
        assert_eq!(node.revision, 2);
    }
}
