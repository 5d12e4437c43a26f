mod common;

use common::{
    config, insert, revision_sum, row_count, scope, site_fixture, RecordingTranslator,
};
use rusqlite::ffi;
use std::cell::Cell;
use variantsync_core::db::{open_db_in_memory, DbError};
use variantsync_core::{
    site_root_path, Node, NodeAggregateId, NodeRepoError, NodeRepoResult, NodeRepository,
    NodeScope, SqliteNodeRepository, SyncError, SyncProgress, SyncRunOptions, SyncRunner,
};

/// Repository whose first `begin`/`commit` calls report a busy database.
///
/// A failing commit leaves the transaction open, as SQLite does on SQLITE_BUSY.
struct BusyRepository<'conn> {
    inner: SqliteNodeRepository<'conn>,
    failing_begins: Cell<usize>,
    failing_commits: Cell<usize>,
}

impl<'conn> BusyRepository<'conn> {
    fn new(inner: SqliteNodeRepository<'conn>) -> Self {
        Self {
            inner,
            failing_begins: Cell::new(0),
            failing_commits: Cell::new(0),
        }
    }

    fn busy(counter: &Cell<usize>) -> NodeRepoResult<()> {
        if counter.get() == 0 {
            return Ok(());
        }
        counter.set(counter.get() - 1);
        Err(NodeRepoError::Db(DbError::Sqlite(
            rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_BUSY),
                Some("database is locked".to_string()),
            ),
        )))
    }
}

impl NodeRepository for BusyRepository<'_> {
    fn find_by_path(&self, scope: &NodeScope, path: &str) -> NodeRepoResult<Option<Node>> {
        self.inner.find_by_path(scope, path)
    }

    fn find_by_identifier(
        &self,
        scope: &NodeScope,
        aggregate_id: NodeAggregateId,
    ) -> NodeRepoResult<Option<Node>> {
        self.inner.find_by_identifier(scope, aggregate_id)
    }

    fn list_children(
        &self,
        scope: &NodeScope,
        parent_id: NodeAggregateId,
    ) -> NodeRepoResult<Vec<Node>> {
        self.inner.list_children(scope, parent_id)
    }

    fn insert_node(&self, node: &Node) -> NodeRepoResult<Node> {
        self.inner.insert_node(node)
    }

    fn update_node(&self, node: &Node) -> NodeRepoResult<Node> {
        self.inner.update_node(node)
    }

    fn begin_unit_of_work(&self) -> NodeRepoResult<()> {
        Self::busy(&self.failing_begins)?;
        self.inner.begin_unit_of_work()
    }

    fn commit_unit_of_work(&self) -> NodeRepoResult<()> {
        Self::busy(&self.failing_commits)?;
        self.inner.commit_unit_of_work()
    }

    fn rollback_unit_of_work(&self) -> NodeRepoResult<()> {
        self.inner.rollback_unit_of_work()
    }
}

fn structural() -> SyncRunOptions {
    SyncRunOptions::default()
}

fn translate() -> SyncRunOptions {
    SyncRunOptions {
        translate: true,
        fail_fast: false,
    }
}

#[test]
fn collect_roots_lists_site_then_documents_without_excluded_types() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::default();
    let fixture = site_fixture(&repo);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let roots = runner.collect_roots(&site_root_path("demo")).unwrap();

    let paths: Vec<&str> = roots.iter().map(|root| root.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            fixture.site.path.as_str(),
            fixture.about.path.as_str(),
            fixture.team.path.as_str(),
            fixture.link_target.path.as_str(),
        ]
    );
}

#[test]
fn run_syncs_every_root_and_reports_progress() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::default();
    let fixture = site_fixture(&repo);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let mut events = Vec::new();
    let report = runner
        .run_with_progress(&site_root_path("demo"), translate(), &mut |event| {
            events.push(match event {
                SyncProgress::Started { roots_total } => format!("start {roots_total}"),
                SyncProgress::RootFinished {
                    index,
                    path,
                    nodes_visited,
                } => format!("{index} {path} {nodes_visited:?}"),
            });
        })
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.roots_total, 4);
    assert_eq!(report.roots_synced, 4);
    assert_eq!(report.nodes_visited, 8);
    assert_eq!(
        events,
        vec![
            "start 4".to_string(),
            "0 /sites/demo Some(3)".to_string(),
            "1 /sites/demo/about Some(3)".to_string(),
            "2 /sites/demo/about/team Some(1)".to_string(),
            "3 /sites/demo/link/target Some(1)".to_string(),
        ]
    );

    // Every default-variant node is mirrored, the shortcut as an ancestor.
    assert_eq!(row_count(&conn, "de"), row_count(&conn, "en"));
    assert_eq!(row_count(&conn, "es"), row_count(&conn, "en"));
    assert_eq!(row_count(&conn, "fr"), 0);

    let german_link = repo
        .find_by_identifier(&scope("de"), fixture.link.aggregate_id)
        .unwrap()
        .unwrap();
    assert_eq!(german_link.text_property("title"), Some("Link"));
    let german_intro = repo
        .find_by_identifier(&scope("de"), fixture.intro.aggregate_id)
        .unwrap()
        .unwrap();
    assert_eq!(german_intro.text_property("text"), Some("[de] Intro"));
}

#[test]
fn second_run_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::default();
    site_fixture(&repo);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    runner.run(&site_root_path("demo"), translate()).unwrap();
    let de = revision_sum(&conn, "de");
    let es = revision_sum(&conn, "es");

    let report = runner.run(&site_root_path("demo"), translate()).unwrap();

    assert!(report.is_success());
    assert_eq!(revision_sum(&conn, "de"), de);
    assert_eq!(revision_sum(&conn, "es"), es);
}

#[test]
fn failing_root_rolls_back_alone_and_run_continues() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::failing_on("Intro");
    let fixture = site_fixture(&repo);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let report = runner.run(&site_root_path("demo"), translate()).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.roots_total, 4);
    assert_eq!(report.roots_synced, 3);
    assert_eq!(report.nodes_visited, 5);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.about.path);
    assert!(report.failures[0].message.contains("cannot translate"));

    let de = scope("de");
    let lookup = |id| repo.find_by_identifier(&de, id).unwrap();
    assert!(lookup(fixture.hello.aggregate_id).is_some());
    assert!(lookup(fixture.intro.aggregate_id).is_none());
    assert!(lookup(fixture.about_main.aggregate_id).is_none());
    assert!(lookup(fixture.team.aggregate_id).is_some());
    // Re-adopted as the parent of the next root.
    assert!(lookup(fixture.about.aggregate_id).is_some());
}

#[test]
fn fail_fast_returns_first_root_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::failing_on("Intro");
    let fixture = site_fixture(&repo);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let err = runner
        .run(
            &site_root_path("demo"),
            SyncRunOptions {
                translate: true,
                fail_fast: true,
            },
        )
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Translation { node_id, .. } if node_id == fixture.intro.aggregate_id
    ));
    assert!(repo
        .find_by_identifier(&scope("de"), fixture.team.aggregate_id)
        .unwrap()
        .is_none());
    assert!(repo
        .find_by_identifier(&scope("de"), fixture.hello.aggregate_id)
        .unwrap()
        .is_some());
}

#[test]
fn missing_site_is_reported_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::default();
    site_fixture(&repo);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let err = runner
        .run(&site_root_path("missing"), translate())
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::RootNotFound { ref path, .. } if path == "/sites/missing"
    ));
    assert_eq!(row_count(&conn, "de"), 0);
}

#[test]
fn invalid_config_is_rejected_by_runner() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::default();
    let mut config = config();
    config.default_variant = None;

    let result = SyncRunner::new(&repo, &config, &translator);

    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[test]
fn failed_commit_rolls_back_its_root_and_later_roots_still_commit() {
    let conn = open_db_in_memory().unwrap();
    let fixture = site_fixture(&SqliteNodeRepository::try_new(&conn).unwrap());
    let repo = BusyRepository::new(SqliteNodeRepository::try_new(&conn).unwrap());
    repo.failing_commits.set(1);
    let translator = RecordingTranslator::default();
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let report = runner.run(&site_root_path("demo"), structural()).unwrap();

    assert!(conn.is_autocommit());
    assert_eq!(report.roots_synced, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.site.path);
    assert!(report.failures[0].message.contains("database is locked"));

    let de = scope("de");
    let lookup = |id| repo.find_by_identifier(&de, id).unwrap();
    assert!(lookup(fixture.hello.aggregate_id).is_none());
    assert!(lookup(fixture.intro.aggregate_id).is_some());
    assert!(lookup(fixture.team.aggregate_id).is_some());

    let report = runner.run(&site_root_path("demo"), structural()).unwrap();
    assert!(report.is_success());
    assert!(lookup(fixture.hello.aggregate_id).is_some());
}

#[test]
fn failed_begin_skips_its_root_without_blocking_the_rest() {
    let conn = open_db_in_memory().unwrap();
    let fixture = site_fixture(&SqliteNodeRepository::try_new(&conn).unwrap());
    let repo = BusyRepository::new(SqliteNodeRepository::try_new(&conn).unwrap());
    repo.failing_begins.set(1);
    let translator = RecordingTranslator::default();
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let report = runner.run(&site_root_path("demo"), structural()).unwrap();

    assert!(conn.is_autocommit());
    assert_eq!(report.roots_synced, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.site.path);
    assert!(repo
        .find_by_identifier(&scope("de"), fixture.hello.aggregate_id)
        .unwrap()
        .is_none());
}

#[test]
fn failed_commit_with_fail_fast_leaves_no_open_transaction() {
    let conn = open_db_in_memory().unwrap();
    site_fixture(&SqliteNodeRepository::try_new(&conn).unwrap());
    let repo = BusyRepository::new(SqliteNodeRepository::try_new(&conn).unwrap());
    repo.failing_commits.set(1);
    let translator = RecordingTranslator::default();
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();

    let err = runner
        .run(
            &site_root_path("demo"),
            SyncRunOptions {
                translate: false,
                fail_fast: true,
            },
        )
        .unwrap_err();

    assert!(matches!(err, SyncError::Repo(NodeRepoError::Db(_))));
    assert!(conn.is_autocommit());
    assert_eq!(row_count(&conn, "de"), 0);
}

#[test]
fn sibling_rename_swap_is_followed_by_identity() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let translator = RecordingTranslator::default();
    let fixture = site_fixture(&repo);
    let mut a = Node::child(&fixture.main, "a", "Text").with_property("text", "A");
    a.sort_order = 1;
    let a = insert(&repo, a);
    let mut b = Node::child(&fixture.main, "b", "Text").with_property("text", "B");
    b.sort_order = 2;
    let b = insert(&repo, b);
    let runner = SyncRunner::new(&repo, &config(), &translator).unwrap();
    runner.run(&site_root_path("demo"), structural()).unwrap();

    let rename = |node: &Node, name: &str| {
        let mut renamed = repo
            .find_by_identifier(&scope("en"), node.aggregate_id)
            .unwrap()
            .unwrap();
        renamed.path = format!("{}/{name}", fixture.main.path);
        repo.update_node(&renamed).unwrap();
    };
    rename(&a, "swap");
    rename(&b, "a");
    rename(&a, "b");

    let report = runner.run(&site_root_path("demo"), structural()).unwrap();

    assert!(report.is_success(), "{:?}", report.failures);
    let de = scope("de");
    let german_a = repo.find_by_identifier(&de, a.aggregate_id).unwrap().unwrap();
    let german_b = repo.find_by_identifier(&de, b.aggregate_id).unwrap().unwrap();
    assert_eq!(german_a.path, format!("{}/b", fixture.main.path));
    assert_eq!(german_b.path, format!("{}/a", fixture.main.path));
    assert_eq!(german_a.text_property("text"), Some("A"));
    assert_eq!(german_b.text_property("text"), Some("B"));
    assert_eq!(row_count(&conn, "de"), row_count(&conn, "en"));

    let revisions = revision_sum(&conn, "de");
    let report = runner.run(&site_root_path("demo"), structural()).unwrap();
    assert!(report.is_success());
    assert_eq!(revision_sum(&conn, "de"), revisions);
}
