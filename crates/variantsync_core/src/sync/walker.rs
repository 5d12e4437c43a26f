//! Pre-order tree walk bounded by document nodes.

use crate::config::ContentTypeGate;
use crate::model::node::Node;
use crate::repo::node_repo::NodeRepository;
use crate::sync::context::VariantContext;
use crate::sync::engine::SyncEngine;
use crate::sync::error::SyncResult;
use crate::translation::Translator;

/// Walks one root and its content, stopping at nested documents.
///
/// Nested documents are separate roots; the runner walks each of them
/// on its own so every document commits independently.
pub struct TreeWalker<'g> {
    gate: &'g ContentTypeGate,
}

impl<'g> TreeWalker<'g> {
    pub fn new(gate: &'g ContentTypeGate) -> Self {
        Self { gate }
    }

    /// Syncs `root` and its non-document descendants, parents first.
    ///
    /// Children are listed through `context`, the context `root` was read from.
    /// Returns the number of visited nodes. The first error aborts the walk.
    pub fn walk<R, T>(
        &self,
        context: &VariantContext<'_, R>,
        engine: &mut SyncEngine<'_, R, T>,
        root: &Node,
        translate: bool,
    ) -> SyncResult<usize>
    where
        R: NodeRepository + ?Sized,
        T: Translator + ?Sized,
    {
        let mut visited = 0;
        self.visit(context, engine, root, translate, &mut visited)?;
        Ok(visited)
    }

    fn visit<R, T>(
        &self,
        context: &VariantContext<'_, R>,
        engine: &mut SyncEngine<'_, R, T>,
        node: &Node,
        translate: bool,
        visited: &mut usize,
    ) -> SyncResult<()>
    where
        R: NodeRepository + ?Sized,
        T: Translator + ?Sized,
    {
        engine.sync(node, translate)?;
        *visited += 1;

        for child in context.children(node)? {
            if self.gate.is_document(&child.node_type) {
                continue;
            }
            self.visit(context, engine, &child, translate, visited)?;
        }
        Ok(())
    }
}
