#![allow(dead_code)]

use rusqlite::Connection;
use std::cell::RefCell;
use variantsync_core::{
    ContentTypeGate, Node, NodeRepository, NodeScope, SqliteNodeRepository, SyncConfig,
    TranslationError, Translator, VariantPolicy,
};

pub const CONFIG_JSON: &str = r#"{
    "workspace": "live",
    "default_variant": "en",
    "variants": {
        "en": {},
        "de": { "translation_strategy": "sync" },
        "es": { "translation_strategy": "sync", "translation_language": "es-ES" },
        "fr": { "translation_strategy": "manual" },
        "it": {}
    },
    "excluded_root_types": ["Shortcut"],
    "node_types": {
        "Document": { "translatable_properties": ["title"] },
        "Site": { "super_types": ["Document"] },
        "Page": { "super_types": ["Document"] },
        "Shortcut": { "super_types": ["Document"] },
        "Folder": {},
        "ContentCollection": {},
        "Headline": { "translatable_properties": ["title"] },
        "Text": { "translatable_properties": ["text"] },
        "Code": { "super_types": ["Text"], "automatic_translation": false }
    }
}"#;

pub fn config() -> SyncConfig {
    SyncConfig::from_json_str(CONFIG_JSON).unwrap()
}

pub fn policy() -> VariantPolicy {
    VariantPolicy::from_config(&config()).unwrap()
}

pub fn gate() -> ContentTypeGate {
    ContentTypeGate::from_config(&config())
}

pub fn scope(variant: &str) -> NodeScope {
    NodeScope::new("live", variant)
}

pub fn insert(repo: &SqliteNodeRepository<'_>, node: Node) -> Node {
    repo.insert_node(&node).unwrap()
}

/// Inserts `name` below `parent` at `sort_order`.
pub fn insert_child(
    repo: &SqliteNodeRepository<'_>,
    parent: &Node,
    name: &str,
    node_type: &str,
    sort_order: i64,
) -> Node {
    let mut node = Node::child(parent, name, node_type);
    node.sort_order = sort_order;
    insert(repo, node)
}

pub fn row_count(conn: &Connection, variant: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM nodes WHERE variant = ?1;",
        [variant],
        |row| row.get(0),
    )
    .unwrap()
}

/// Sum of revisions across one variant; unchanged means nothing was written.
pub fn revision_sum(conn: &Connection, variant: &str) -> i64 {
    conn.query_row(
        "SELECT COALESCE(SUM(revision), 0) FROM nodes WHERE variant = ?1;",
        [variant],
        |row| row.get(0),
    )
    .unwrap()
}

/// Translator double: prefixes the target language and records each call.
#[derive(Default)]
pub struct RecordingTranslator {
    pub calls: RefCell<Vec<(String, String, String)>>,
    pub fail_on: Option<String>,
}

impl RecordingTranslator {
    pub fn failing_on(text: &str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_on: Some(text.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Translator for RecordingTranslator {
    fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        self.calls.borrow_mut().push((
            text.to_string(),
            source_language.to_string(),
            target_language.to_string(),
        ));
        if self.fail_on.as_deref() == Some(text) {
            return Err(TranslationError::Backend("upstream unavailable".to_string()));
        }
        Ok(format!("[{target_language}] {text}"))
    }
}

/// Site fixture in the default variant.
///
/// ```text
/// /                         Folder
/// /sites                    Folder
/// /sites/demo               Site        title=Demo
/// /sites/demo/main          ContentCollection
/// /sites/demo/main/hello    Text        text=Hello
/// /sites/demo/about         Page        title=About
/// /sites/demo/about/main    ContentCollection
/// /sites/demo/about/main/intro  Text    text=Intro
/// /sites/demo/about/team    Page        title=Team
/// /sites/demo/link          Shortcut    title=Link
/// /sites/demo/link/target   Page        title=Target
/// ```
pub struct SiteFixture {
    pub root: Node,
    pub sites: Node,
    pub site: Node,
    pub main: Node,
    pub hello: Node,
    pub about: Node,
    pub about_main: Node,
    pub intro: Node,
    pub team: Node,
    pub link: Node,
    pub link_target: Node,
}

pub fn site_fixture(repo: &SqliteNodeRepository<'_>) -> SiteFixture {
    let root = insert(repo, Node::root(scope("en"), "Folder"));
    let sites = insert_child(repo, &root, "sites", "Folder", 0);
    let site = insert(
        repo,
        Node::child(&sites, "demo", "Site").with_property("title", "Demo"),
    );
    let main = insert_child(repo, &site, "main", "ContentCollection", 0);
    let hello = insert(
        repo,
        Node::child(&main, "hello", "Text")
            .with_property("text", "Hello")
            .with_property("layout", "wide"),
    );
    let mut about = Node::child(&site, "about", "Page").with_property("title", "About");
    about.sort_order = 1;
    let about = insert(repo, about);
    let about_main = insert_child(repo, &about, "main", "ContentCollection", 0);
    let intro = insert(
        repo,
        Node::child(&about_main, "intro", "Text").with_property("text", "Intro"),
    );
    let mut team = Node::child(&about, "team", "Page").with_property("title", "Team");
    team.sort_order = 1;
    let team = insert(repo, team);
    let mut link = Node::child(&site, "link", "Shortcut").with_property("title", "Link");
    link.sort_order = 2;
    let link = insert(repo, link);
    let link_target = insert(
        repo,
        Node::child(&link, "target", "Page").with_property("title", "Target"),
    );

    SiteFixture {
        root,
        sites,
        site,
        main,
        hello,
        about,
        about_main,
        intro,
        team,
        link,
        link_target,
    }
}
