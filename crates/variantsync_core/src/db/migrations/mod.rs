//! Embedded node store schema steps.
//!
//! Steps are append-only: a released step is never edited, a change
//! becomes a new step with the next version.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

/// One schema step, applied when the store is below `version`.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "nodes",
        sql: include_str!("0001_nodes.sql"),
    },
    SchemaStep {
        version: 2,
        name: "node_indexes",
        sql: include_str!("0002_node_indexes.sql"),
    },
];

/// Schema version this binary migrates stores up to.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the store up to [`latest_version`].
///
/// Pending steps run inside one transaction, so a failing step leaves the
/// store at its previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = stored_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    if from == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in SCHEMA_STEPS.iter().filter(|step| step.version > from) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| {
                error!(
                    "event=db_migrate module=db status=error version={} name={} error={source}",
                    step.version, step.name
                );
                DbError::Migration {
                    version: step.version,
                    name: step.name,
                    source,
                }
            })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
