//! Full-tree sync driver with per-document persistence.
//!
//! # Responsibility
//! - Enumerate walk roots: the site root plus every document below it.
//! - Walk each root inside its own unit of work.
//! - Record and log every root failure; never drop one silently.
//!
//! # Invariants
//! - A root's writes become durable only when its whole walk succeeded.
//! - A failing root rolls back alone; earlier roots stay committed.
//! - No transaction stays open after a root, whether its walk or its commit failed.
//! - With `fail_fast`, the first root failure ends the run with that error.

use crate::config::{ContentTypeGate, SyncConfig, VariantPolicy};
use crate::model::node::Node;
use crate::repo::node_repo::NodeRepository;
use crate::sync::context::VariantContext;
use crate::sync::engine::SyncEngine;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::walker::TreeWalker;
use crate::translation::Translator;
use log::{error, info, warn};
use std::time::Instant;

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncRunOptions {
    /// Route translatable text through the translator.
    pub translate: bool,
    /// Stop at the first failing root instead of continuing.
    pub fail_fast: bool,
}

/// One root whose walk failed and was rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFailure {
    pub path: String,
    pub message: String,
}

/// Summary of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub roots_total: usize,
    pub roots_synced: usize,
    pub nodes_visited: usize,
    pub failures: Vec<RootFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress events emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgress<'p> {
    /// Roots were enumerated.
    Started { roots_total: usize },
    /// One root finished; `nodes_visited` is `None` when it failed.
    RootFinished {
        index: usize,
        path: &'p str,
        nodes_visited: Option<usize>,
    },
}

/// Drives full-tree syncs for one configuration.
pub struct SyncRunner<'a, R: NodeRepository + ?Sized, T: Translator + ?Sized> {
    repo: &'a R,
    translator: &'a T,
    workspace: String,
    policy: VariantPolicy,
    gate: ContentTypeGate,
}

impl<'a, R: NodeRepository + ?Sized, T: Translator + ?Sized> SyncRunner<'a, R, T> {
    pub fn new(repo: &'a R, config: &SyncConfig, translator: &'a T) -> Result<Self, SyncError> {
        Ok(Self {
            repo,
            translator,
            workspace: config.workspace.clone(),
            policy: VariantPolicy::from_config(config)?,
            gate: ContentTypeGate::from_config(config),
        })
    }

    pub fn policy(&self) -> &VariantPolicy {
        &self.policy
    }

    pub fn gate(&self) -> &ContentTypeGate {
        &self.gate
    }

    /// Lists walk roots below `root_path` in the default variant.
    ///
    /// The root comes first, followed by its documents in pre-order.
    /// Excluded root types still bound walks but are never roots themselves.
    pub fn collect_roots(&self, root_path: &str) -> SyncResult<Vec<Node>> {
        let context = self.engine().default_context();
        let root = context
            .get_node(root_path)?
            .ok_or_else(|| SyncError::RootNotFound {
                scope: context.scope().clone(),
                path: root_path.to_string(),
            })?;

        let mut roots = vec![root];
        let documents = context.document_descendants(&roots[0], &self.gate)?;
        roots.extend(
            documents
                .into_iter()
                .filter(|node| !self.gate.is_excluded_root(&node.node_type)),
        );
        Ok(roots)
    }

    pub fn run(&self, root_path: &str, options: SyncRunOptions) -> SyncResult<SyncReport> {
        self.run_with_progress(root_path, options, &mut |_| {})
    }

    /// Syncs every root below `root_path`, committing after each one.
    pub fn run_with_progress(
        &self,
        root_path: &str,
        options: SyncRunOptions,
        progress: &mut dyn FnMut(SyncProgress<'_>),
    ) -> SyncResult<SyncReport> {
        let started_at = Instant::now();
        let roots = self.collect_roots(root_path)?;
        let mut report = SyncReport {
            roots_total: roots.len(),
            ..SyncReport::default()
        };
        info!(
            "event=sync_run module=sync status=start root={root_path} roots={} translate={} fail_fast={}",
            roots.len(),
            options.translate,
            options.fail_fast
        );
        progress(SyncProgress::Started {
            roots_total: roots.len(),
        });

        let mut engine = self.engine();
        let context = engine.default_context();
        let walker = TreeWalker::new(&self.gate);

        for (index, root) in roots.iter().enumerate() {
            match self.sync_root(&context, &mut engine, &walker, &root.path, options.translate) {
                Ok(visited) => {
                    report.roots_synced += 1;
                    report.nodes_visited += visited;
                    progress(SyncProgress::RootFinished {
                        index,
                        path: &root.path,
                        nodes_visited: Some(visited),
                    });
                }
                Err(err) => {
                    error!(
                        "event=sync_root module=sync status=error path={} error={err}",
                        root.path
                    );
                    if options.fail_fast {
                        return Err(err);
                    }
                    report.failures.push(RootFailure {
                        path: root.path.clone(),
                        message: err.to_string(),
                    });
                    progress(SyncProgress::RootFinished {
                        index,
                        path: &root.path,
                        nodes_visited: None,
                    });
                }
            }
        }

        info!(
            "event=sync_run module=sync status={} roots={} synced={} failed={} nodes={} duration_ms={}",
            if report.is_success() { "ok" } else { "error" },
            report.roots_total,
            report.roots_synced,
            report.failures.len(),
            report.nodes_visited,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn sync_root(
        &self,
        context: &VariantContext<'_, R>,
        engine: &mut SyncEngine<'_, R, T>,
        walker: &TreeWalker<'_>,
        path: &str,
        translate: bool,
    ) -> SyncResult<usize> {
        self.repo.begin_unit_of_work()?;
        let walked = context
            .get_node(path)
            .map_err(SyncError::from)
            .and_then(|root| {
                root.ok_or_else(|| SyncError::RootNotFound {
                    scope: context.scope().clone(),
                    path: path.to_string(),
                })
            })
            .and_then(|root| walker.walk(context, engine, &root, translate))
            .and_then(|visited| {
                // A failed COMMIT can leave the transaction open; it is rolled back below.
                self.repo.commit_unit_of_work()?;
                Ok(visited)
            });

        match walked {
            Ok(visited) => {
                info!("event=sync_root module=sync status=ok path={path} nodes={visited}");
                Ok(visited)
            }
            Err(err) => {
                if let Err(rollback_err) = self.repo.rollback_unit_of_work() {
                    warn!(
                        "event=sync_root module=sync status=error path={path} error_code=rollback_failed error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }

    fn engine(&self) -> SyncEngine<'_, R, T> {
        SyncEngine::new(
            self.repo,
            &self.policy,
            &self.gate,
            self.translator,
            self.workspace.clone(),
        )
    }
}
