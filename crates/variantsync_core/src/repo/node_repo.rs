//! Node repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide scoped lookup and write APIs for per-variant node records.
//! - Keep SQL details and ordering behavior inside repository boundary.
//! - Expose unit-of-work boundaries so callers can commit per subtree.
//!
//! # Invariants
//! - Every query is scoped by `(workspace, variant)`.
//! - Lookups return tombstoned nodes too; callers inspect `is_removed`.
//! - Child listing is deterministic: `sort_order ASC, aggregate_id ASC`.
//! - Every successful update bumps `revision` by exactly one.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::node::{Node, NodeAggregateId, NodeScope, NodeValidationError};
use crate::model::variant::VariantId;
use log::debug;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NODE_SELECT_SQL: &str = "SELECT
    workspace,
    variant,
    aggregate_id,
    parent_id,
    path,
    node_type,
    properties,
    sort_order,
    is_removed,
    revision,
    created_at,
    updated_at
FROM nodes";

const REQUIRED_COLUMNS: &[&str] = &[
    "workspace",
    "variant",
    "aggregate_id",
    "parent_id",
    "path",
    "node_type",
    "properties",
    "sort_order",
    "is_removed",
    "revision",
    "created_at",
    "updated_at",
];

/// Result type used by node repository operations.
pub type NodeRepoResult<T> = Result<T, NodeRepoError>;

/// Errors from node repository operations.
#[derive(Debug)]
pub enum NodeRepoError {
    /// Node failed record-level validation.
    Validation(NodeValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Update target does not exist in the given scope.
    NodeNotFound {
        scope: NodeScope,
        aggregate_id: NodeAggregateId,
    },
    /// Write rejected by a uniqueness constraint (identity or path).
    Conflict {
        scope: NodeScope,
        path: String,
        message: String,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to valid read model.
    InvalidData(String),
}

impl Display for NodeRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NodeNotFound {
                scope,
                aggregate_id,
            } => write!(f, "node {aggregate_id} not found in {scope}"),
            Self::Conflict {
                scope,
                path,
                message,
            } => write!(f, "node write at `{path}` in {scope} conflicts: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "node repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "node repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "node repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted node data: {message}"),
        }
    }
}

impl Error for NodeRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NodeValidationError> for NodeRepoError {
    fn from(value: NodeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for NodeRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for NodeRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for scoped node storage.
pub trait NodeRepository {
    /// Loads one node by path within a scope.
    fn find_by_path(&self, scope: &NodeScope, path: &str) -> NodeRepoResult<Option<Node>>;
    /// Loads one node by aggregate identity within a scope.
    fn find_by_identifier(
        &self,
        scope: &NodeScope,
        aggregate_id: NodeAggregateId,
    ) -> NodeRepoResult<Option<Node>>;
    /// Lists direct children of one node, tombstones included.
    fn list_children(
        &self,
        scope: &NodeScope,
        parent_id: NodeAggregateId,
    ) -> NodeRepoResult<Vec<Node>>;
    /// Inserts a new record and returns it as persisted.
    fn insert_node(&self, node: &Node) -> NodeRepoResult<Node>;
    /// Overwrites an existing record and returns it as persisted.
    fn update_node(&self, node: &Node) -> NodeRepoResult<Node>;
    /// Opens a unit of work; writes are durable only after commit.
    fn begin_unit_of_work(&self) -> NodeRepoResult<()>;
    fn commit_unit_of_work(&self) -> NodeRepoResult<()>;
    fn rollback_unit_of_work(&self) -> NodeRepoResult<()>;
}

/// SQLite-backed node repository.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> NodeRepoResult<Self> {
        ensure_node_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_one(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> NodeRepoResult<Option<Node>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }
        Ok(None)
    }

    fn load_required(&self, scope: &NodeScope, aggregate_id: NodeAggregateId) -> NodeRepoResult<Node> {
        self.find_by_identifier(scope, aggregate_id)?
            .ok_or_else(|| NodeRepoError::NodeNotFound {
                scope: scope.clone(),
                aggregate_id,
            })
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn find_by_path(&self, scope: &NodeScope, path: &str) -> NodeRepoResult<Option<Node>> {
        self.query_one(
            &format!(
                "{NODE_SELECT_SQL}
                 WHERE workspace = ?1
                   AND variant = ?2
                   AND path = ?3;"
            ),
            params![scope.workspace, scope.variant.as_str(), path],
        )
    }

    fn find_by_identifier(
        &self,
        scope: &NodeScope,
        aggregate_id: NodeAggregateId,
    ) -> NodeRepoResult<Option<Node>> {
        self.query_one(
            &format!(
                "{NODE_SELECT_SQL}
                 WHERE workspace = ?1
                   AND variant = ?2
                   AND aggregate_id = ?3;"
            ),
            params![
                scope.workspace,
                scope.variant.as_str(),
                aggregate_id.to_string()
            ],
        )
    }

    fn list_children(
        &self,
        scope: &NodeScope,
        parent_id: NodeAggregateId,
    ) -> NodeRepoResult<Vec<Node>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE workspace = ?1
               AND variant = ?2
               AND parent_id = ?3
             ORDER BY sort_order ASC, aggregate_id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            scope.workspace,
            scope.variant.as_str(),
            parent_id.to_string()
        ])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_node_row(row)?);
        }
        Ok(items)
    }

    fn insert_node(&self, node: &Node) -> NodeRepoResult<Node> {
        node.validate()?;
        let properties = encode_properties(node)?;

        self.conn
            .execute(
                "INSERT INTO nodes (
                    workspace,
                    variant,
                    aggregate_id,
                    parent_id,
                    path,
                    node_type,
                    properties,
                    sort_order,
                    is_removed
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    node.scope.workspace,
                    node.scope.variant.as_str(),
                    node.aggregate_id.to_string(),
                    node.parent_id.map(|value| value.to_string()),
                    node.path,
                    node.node_type,
                    properties,
                    node.sort_order,
                    bool_to_int(node.is_removed),
                ],
            )
            .map_err(|err| map_write_error(err, node))?;

        debug!(
            "event=node_insert module=repo status=ok scope={} node_id={} path={}",
            node.scope, node.aggregate_id, node.path
        );
        self.load_required(&node.scope, node.aggregate_id)
    }

    fn update_node(&self, node: &Node) -> NodeRepoResult<Node> {
        node.validate()?;
        let properties = encode_properties(node)?;

        let changed = self
            .conn
            .execute(
                "UPDATE nodes
                 SET parent_id = ?4,
                     path = ?5,
                     node_type = ?6,
                     properties = ?7,
                     sort_order = ?8,
                     is_removed = ?9,
                     revision = revision + 1,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE workspace = ?1
                   AND variant = ?2
                   AND aggregate_id = ?3;",
                params![
                    node.scope.workspace,
                    node.scope.variant.as_str(),
                    node.aggregate_id.to_string(),
                    node.parent_id.map(|value| value.to_string()),
                    node.path,
                    node.node_type,
                    properties,
                    node.sort_order,
                    bool_to_int(node.is_removed),
                ],
            )
            .map_err(|err| map_write_error(err, node))?;

        if changed == 0 {
            return Err(NodeRepoError::NodeNotFound {
                scope: node.scope.clone(),
                aggregate_id: node.aggregate_id,
            });
        }

        debug!(
            "event=node_update module=repo status=ok scope={} node_id={} path={}",
            node.scope, node.aggregate_id, node.path
        );
        self.load_required(&node.scope, node.aggregate_id)
    }

    fn begin_unit_of_work(&self) -> NodeRepoResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit_unit_of_work(&self) -> NodeRepoResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback_unit_of_work(&self) -> NodeRepoResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }
}

fn map_write_error(err: rusqlite::Error, node: &Node) -> NodeRepoError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, ref message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            NodeRepoError::Conflict {
                scope: node.scope.clone(),
                path: node.path.clone(),
                message: message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            }
        }
        other => other.into(),
    }
}

fn encode_properties(node: &Node) -> NodeRepoResult<String> {
    serde_json::to_string(&node.properties).map_err(|err| {
        NodeRepoError::InvalidData(format!(
            "cannot encode properties of node {}: {err}",
            node.aggregate_id
        ))
    })
}

fn parse_node_row(row: &Row<'_>) -> NodeRepoResult<Node> {
    let aggregate_id_text: String = row.get("aggregate_id")?;
    let aggregate_id = parse_uuid(&aggregate_id_text, "nodes.aggregate_id")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "nodes.parent_id"))
        .transpose()?;

    let properties_text: String = row.get("properties")?;
    let properties = serde_json::from_str(&properties_text).map_err(|err| {
        NodeRepoError::InvalidData(format!(
            "invalid properties json for node {aggregate_id}: {err}"
        ))
    })?;

    let is_removed = match row.get::<_, i64>("is_removed")? {
        0 => false,
        1 => true,
        other => {
            return Err(NodeRepoError::InvalidData(format!(
                "invalid is_removed value `{other}` in nodes.is_removed"
            )));
        }
    };

    Ok(Node {
        aggregate_id,
        scope: NodeScope {
            workspace: row.get("workspace")?,
            variant: VariantId::new(row.get::<_, String>("variant")?),
        },
        parent_id,
        path: row.get("path")?,
        node_type: row.get("node_type")?,
        properties,
        sort_order: row.get("sort_order")?,
        is_removed,
        revision: row.get("revision")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> NodeRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| NodeRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn ensure_node_connection_ready(conn: &Connection) -> NodeRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(NodeRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'nodes'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(NodeRepoError::MissingRequiredTable("nodes"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(nodes);")?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }
    for column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(NodeRepoError::MissingRequiredColumn {
                table: "nodes",
                column,
            });
        }
    }

    Ok(())
}
