//! Idempotent, self-healing schema migrations.
//!
//! Every statement here is safe to run against a database that already
//! has the schema applied: `CREATE TABLE`/`CREATE INDEX` use `IF NOT
//! EXISTS`, and columns added after the initial release go through
//! [`add_column_if_not_exists`], which swallows sqlite's "duplicate
//! column" error.

use rusqlite::Connection;

const BASE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS insights (
    id          TEXT PRIMARY KEY,
    content     TEXT NOT NULL,
    category    TEXT DEFAULT 'fact',
    importance  INTEGER DEFAULT 3,
    tags        TEXT DEFAULT '[]',
    entities    TEXT DEFAULT '[]',
    source      TEXT DEFAULT 'user',
    access_count INTEGER DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    deleted_at  TEXT
);

CREATE TABLE IF NOT EXISTS edges (
    source_id   TEXT NOT NULL,
    target_id   TEXT NOT NULL,
    edge_type   TEXT NOT NULL CHECK(edge_type IN ('temporal','semantic','causal','entity')),
    weight      REAL DEFAULT 1.0,
    metadata    TEXT DEFAULT '{}',
    created_at  TEXT NOT NULL,
    PRIMARY KEY (source_id, target_id, edge_type),
    FOREIGN KEY (source_id) REFERENCES insights(id) ON DELETE CASCADE,
    FOREIGN KEY (target_id) REFERENCES insights(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_insights_category ON insights(category);
CREATE INDEX IF NOT EXISTS idx_insights_importance ON insights(importance);
CREATE INDEX IF NOT EXISTS idx_insights_created ON insights(created_at);
CREATE INDEX IF NOT EXISTS idx_insights_deleted ON insights(deleted_at);
CREATE INDEX IF NOT EXISTS idx_insights_source ON insights(source);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(edge_type);
CREATE INDEX IF NOT EXISTS idx_edges_source_type ON edges(source_id, edge_type);
CREATE INDEX IF NOT EXISTS idx_edges_target_type ON edges(target_id, edge_type);

CREATE TABLE IF NOT EXISTS oplog (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    operation   TEXT NOT NULL,
    insight_id  TEXT,
    detail      TEXT DEFAULT '',
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_oplog_created ON oplog(created_at);
";

/// Run `stmt`, ignoring sqlite's duplicate-column error so a prior
/// successful run of this migration is a no-op on the next startup.
fn add_column_if_not_exists(conn: &Connection, stmt: &str) -> rusqlite::Result<()> {
    match conn.execute(stmt, []) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(_, Some(msg)))
            if msg.to_lowercase().contains("duplicate column") =>
        {
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Narrow `edges.edge_type`'s CHECK constraint if the database predates
/// the fixed four-type enum (dropping any `narrative` rows first). A
/// no-op once the narrower schema is in place, since the probe insert
/// then fails its own CHECK constraint.
fn narrow_edge_type_check(conn: &Connection) -> rusqlite::Result<()> {
    let probe = conn.execute(
        "INSERT INTO edges VALUES ('__probe','__probe','narrative',0,'{}',datetime('now'))",
        [],
    );
    if probe.is_err() {
        return Ok(());
    }

    conn.execute("DELETE FROM edges WHERE source_id = '__probe'", [])?;
    conn.execute("DELETE FROM edges WHERE edge_type = 'narrative'", [])?;
    conn.execute_batch(
        "ALTER TABLE edges RENAME TO edges_old;
         CREATE TABLE edges (
             source_id   TEXT NOT NULL,
             target_id   TEXT NOT NULL,
             edge_type   TEXT NOT NULL CHECK(edge_type IN ('temporal','semantic','causal','entity')),
             weight      REAL DEFAULT 1.0,
             metadata    TEXT DEFAULT '{}',
             created_at  TEXT NOT NULL,
             PRIMARY KEY (source_id, target_id, edge_type),
             FOREIGN KEY (source_id) REFERENCES insights(id) ON DELETE CASCADE,
             FOREIGN KEY (target_id) REFERENCES insights(id) ON DELETE CASCADE
         );
         INSERT INTO edges SELECT * FROM edges_old;
         DROP TABLE edges_old;
         CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
         CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
         CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(edge_type);",
    )
}

/// Soft-delete any legacy insight left over from the retired
/// `narrative` category. A no-op once none remain.
fn soft_delete_narrative_insights(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE insights SET deleted_at = datetime('now') WHERE category = 'narrative' AND deleted_at IS NULL",
        [],
    )?;
    Ok(())
}

/// Apply the base schema and every subsequent additive migration. Safe
/// to call on every open.
pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(BASE_SCHEMA)?;

    add_column_if_not_exists(conn, "ALTER TABLE insights ADD COLUMN last_accessed_at TEXT")?;
    add_column_if_not_exists(conn, "ALTER TABLE insights ADD COLUMN embedding BLOB")?;
    add_column_if_not_exists(
        conn,
        "ALTER TABLE insights ADD COLUMN effective_importance REAL DEFAULT 0.5",
    )?;

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_insights_effective_imp ON insights(effective_importance);
         CREATE INDEX IF NOT EXISTS idx_prune_candidates
             ON insights(deleted_at, importance, access_count, effective_importance);",
    )?;

    soft_delete_narrative_insights(conn)?;
    narrow_edge_type_check(conn)?;

    Ok(())
}
