//! SQLite-backed storage: insight/edge/oplog CRUD, transactions, and
//! retention queries.
//!
//! The [`queries`] module holds free functions over a bare
//! `&Connection` — these are what the write pipeline and edge
//! generators call while already inside [`Store::in_transaction`].
//! [`Store`]'s own methods are thin, lock-acquiring wrappers around the
//! same functions for callers outside a transaction (the CLI, recall).
//! Never call a `Store` method from inside `in_transaction`: the
//! underlying `Mutex<Connection>` is not reentrant and it will
//! deadlock — use the `queries` function with the transaction's
//! `&Connection` instead.

use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::model::{Category, Edge, EdgeMetadata, EdgeType, Insight, format_timestamp, parse_timestamp};
use crate::retention::{PRUNE_BATCH_SIZE, compute_effective_importance};

use super::migrations;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("insight {0:?} not found")]
    NotFound(String),

    #[error("insight {0:?} not found or already deleted")]
    AlreadyDeleted(String),

    #[error("nested transaction rejected")]
    NestedTransaction,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A single oplog row.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OplogEntry {
    pub id: i64,
    pub operation: String,
    pub insight_id: String,
    pub detail: String,
    pub created_at: String,
}

/// A non-immune insight below the retention threshold.
#[derive(Debug, Clone)]
pub struct RetentionCandidate {
    pub insight: Insight,
    pub effective_importance: f64,
    pub days_since_access: f64,
    pub edge_count: i64,
}

/// Aggregate statistics surfaced by `mnemon status`.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_insights: i64,
    pub deleted_insights: i64,
    pub by_category: std::collections::BTreeMap<String, i64>,
    pub edge_count: i64,
    pub oplog_count: i64,
    pub top_entities: Vec<EntityCount>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EntityCount {
    pub entity: String,
    pub count: i64,
}

fn scan_insight(row: &rusqlite::Row) -> rusqlite::Result<Insight> {
    let category_str: String = row.get(2)?;
    let tags_json: String = row.get(4)?;
    let entities_json: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    let deleted_at: Option<String> = row.get(10)?;
    let last_accessed_at: Option<String> = row.get(11)?;

    Ok(Insight {
        id: row.get(0)?,
        content: row.get(1)?,
        category: Category::parse(&category_str).unwrap_or_default(),
        importance: row.get(3)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        entities: serde_json::from_str(&entities_json).unwrap_or_default(),
        source: row.get(6)?,
        access_count: row.get(7)?,
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_timestamp(&updated_at).unwrap_or_else(Utc::now),
        last_accessed_at: last_accessed_at.and_then(|s| parse_timestamp(&s)),
        deleted_at: deleted_at.and_then(|s| parse_timestamp(&s)),
        embedding: None,
        effective_importance: row.get(12)?,
    })
}

fn scan_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
    let edge_type_str: String = row.get(2)?;
    let metadata_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Edge {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        edge_type: EdgeType::parse(&edge_type_str).unwrap_or(EdgeType::Temporal),
        weight: row.get(3)?,
        metadata: EdgeMetadata::from_json(&metadata_json),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
    })
}

const INSIGHT_COLUMNS: &str = "id, content, category, importance, tags, entities, source,
     access_count, created_at, updated_at, deleted_at, last_accessed_at, effective_importance";
const EDGE_COLUMNS: &str = "source_id, target_id, edge_type, weight, metadata, created_at";

/// Free functions over a bare `&Connection`. Safe to call from inside
/// [`Store::in_transaction`] or directly against a connection obtained
/// any other way.
pub mod queries {
    use super::*;

    pub fn insert_insight(conn: &Connection, i: &Insight) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO insights
             (id, content, category, importance, tags, entities, source,
              access_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                i.id,
                i.content,
                i.category.as_str(),
                i.importance,
                serde_json::to_string(&i.tags).unwrap(),
                serde_json::to_string(&i.entities).unwrap(),
                i.source,
                i.access_count,
                format_timestamp(i.created_at),
                format_timestamp(i.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_insight(conn: &Connection, id: &str) -> rusqlite::Result<Option<Insight>> {
        conn.query_row(
            &format!("SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = ?1 AND deleted_at IS NULL"),
            params![id],
            scan_insight,
        )
        .optional()
    }

    pub fn get_insight_include_deleted(conn: &Connection, id: &str) -> rusqlite::Result<Option<Insight>> {
        conn.query_row(&format!("SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = ?1"), params![id], scan_insight)
            .optional()
    }

    pub fn get_all_active_insights(conn: &Connection) -> rusqlite::Result<Vec<Insight>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {INSIGHT_COLUMNS} FROM insights WHERE deleted_at IS NULL ORDER BY created_at DESC"))?;
        let rows = stmt.query_map([], scan_insight)?;
        rows.collect()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn query_insights(
        conn: &Connection,
        keyword: &str,
        category: &str,
        min_importance: u8,
        source: &str,
        limit: i64,
    ) -> rusqlite::Result<Vec<Insight>> {
        let mut conditions = vec!["deleted_at IS NULL".to_string()];
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !keyword.is_empty() {
            conditions.push("content LIKE ?".to_string());
            args.push(Box::new(format!("%{keyword}%")));
        }
        if !category.is_empty() {
            conditions.push("category = ?".to_string());
            args.push(Box::new(category.to_string()));
        }
        if min_importance > 0 {
            conditions.push("importance >= ?".to_string());
            args.push(Box::new(min_importance));
        }
        if !source.is_empty() {
            conditions.push("source = ?".to_string());
            args.push(Box::new(source.to_string()));
        }

        let limit = if limit <= 0 { 20 } else { limit };
        args.push(Box::new(limit));

        let sql = format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE {} ORDER BY importance DESC, created_at DESC LIMIT ?",
            conditions.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params.as_slice(), scan_insight)?;
        rows.collect()
    }

    pub fn delete_edges_by_node(conn: &Connection, node_id: &str) -> rusqlite::Result<()> {
        conn.execute("DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1", params![node_id])?;
        Ok(())
    }

    pub fn soft_delete_insight(conn: &Connection, id: &str) -> Result<()> {
        let now = format_timestamp(Utc::now());
        let n = conn.execute(
            "UPDATE insights SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if n == 0 {
            return Err(StoreError::AlreadyDeleted(id.to_string()));
        }
        delete_edges_by_node(conn, id)?;
        Ok(())
    }

    pub fn update_entities(conn: &Connection, id: &str, entities: &[String]) -> rusqlite::Result<()> {
        let now = format_timestamp(Utc::now());
        let mut sorted = entities.to_vec();
        sorted.sort();
        conn.execute(
            "UPDATE insights SET entities = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(&sorted).unwrap(), now, id],
        )?;
        Ok(())
    }

    pub fn increment_access_count(conn: &Connection, id: &str) -> rusqlite::Result<()> {
        let now = format_timestamp(Utc::now());
        conn.execute(
            "UPDATE insights SET access_count = access_count + 1, last_accessed_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    pub fn boost_retention(conn: &Connection, id: &str) -> Result<()> {
        let now = format_timestamp(Utc::now());
        let n = conn.execute(
            "UPDATE insights SET access_count = access_count + 3, last_accessed_at = ?1,
             updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if n == 0 {
            return Err(StoreError::AlreadyDeleted(id.to_string()));
        }
        Ok(())
    }

    pub fn refresh_effective_importance(conn: &Connection, id: &str) -> Result<f64> {
        let (importance, access_count, created_at, last_accessed_at): (u8, u32, String, Option<String>) = conn
            .query_row(
                "SELECT importance, access_count, created_at, last_accessed_at
                 FROM insights WHERE id = ?1 AND deleted_at IS NULL",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let last_access = last_accessed_at
            .and_then(|s| parse_timestamp(&s))
            .or_else(|| parse_timestamp(&created_at))
            .unwrap_or_else(Utc::now);
        let days_since = (Utc::now() - last_access).num_seconds().max(0) as f64 / 86_400.0;

        let edge_count: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM edges WHERE source_id = ?1) +
                    (SELECT COUNT(*) FROM edges WHERE target_id = ?1)",
            params![id],
            |r| r.get(0),
        )?;

        let ei = compute_effective_importance(importance, access_count, days_since, edge_count);
        conn.execute("UPDATE insights SET effective_importance = ?1 WHERE id = ?2", params![ei, id])?;
        Ok(ei)
    }

    /// Recompute `effective_importance` for every active insight and
    /// return those below `threshold` and non-immune, ascending.
    pub fn get_retention_candidates(conn: &Connection, threshold: f64, limit: i64) -> Result<(Vec<RetentionCandidate>, i64)> {
        let insights = get_all_active_insights(conn)?;

        let edge_counts: std::collections::HashMap<String, i64> = {
            let mut stmt = conn.prepare(
                "SELECT id, SUM(cnt) FROM (
                   SELECT source_id AS id, COUNT(*) AS cnt FROM edges GROUP BY source_id
                   UNION ALL
                   SELECT target_id AS id, COUNT(*) AS cnt FROM edges GROUP BY target_id
                 ) GROUP BY id",
            )?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let now = Utc::now();
        let mut updates = Vec::new();
        let mut candidates = Vec::new();
        for ins in &insights {
            let last_access = ins.last_accessed_at.unwrap_or(ins.created_at);
            let days_since = (now - last_access).num_seconds().max(0) as f64 / 86_400.0;
            let edge_count = *edge_counts.get(&ins.id).unwrap_or(&0);
            let ei = compute_effective_importance(ins.importance, ins.access_count, days_since, edge_count);
            updates.push((ei, ins.id.clone()));

            if ei < threshold && !ins.is_immune() {
                candidates.push(RetentionCandidate {
                    insight: ins.clone(),
                    effective_importance: ei,
                    days_since_access: days_since,
                    edge_count,
                });
            }
        }

        if !updates.is_empty() {
            let batch = || -> rusqlite::Result<()> {
                conn.execute("BEGIN", [])?;
                for (ei, id) in &updates {
                    conn.execute("UPDATE insights SET effective_importance = ?1 WHERE id = ?2", params![ei, id])?;
                }
                conn.execute("COMMIT", [])?;
                Ok(())
            };
            if let Err(e) = batch() {
                let _ = conn.execute("ROLLBACK", []);
                tracing::warn!(error = %e, "batch effective-importance update failed, rolled back");
            }
        }

        candidates.sort_by(|a, b| a.effective_importance.partial_cmp(&b.effective_importance).unwrap());
        let total = insights.len() as i64;
        if limit > 0 && candidates.len() as i64 > limit {
            candidates.truncate(limit as usize);
        }
        Ok((candidates, total))
    }

    pub fn count_active_insights(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row("SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL", [], |r| r.get(0))
    }

    /// Soft-delete the lowest-EI non-immune insights when over capacity.
    pub fn auto_prune(conn: &Connection, max_insights: i64, exclude_ids: &[String]) -> rusqlite::Result<i64> {
        let total: i64 = count_active_insights(conn)?;
        if total <= max_insights {
            return Ok(0);
        }
        let excess = (total - max_insights).min(PRUNE_BATCH_SIZE);

        let exclude_clause = if exclude_ids.is_empty() {
            String::new()
        } else {
            format!("AND id NOT IN ({})", exclude_ids.iter().map(|_| "?").collect::<Vec<_>>().join(","))
        };
        let sql = format!(
            "SELECT id FROM insights WHERE deleted_at IS NULL AND importance < 4
             AND access_count < 3 {exclude_clause} ORDER BY effective_importance ASC LIMIT ?"
        );

        let ids: Vec<String> = {
            let mut stmt = conn.prepare(&sql)?;
            let mut args: Vec<&dyn rusqlite::ToSql> = exclude_ids.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
            args.push(&excess);
            let rows = stmt.query_map(args.as_slice(), |r| r.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let now = format_timestamp(Utc::now());
        let mut pruned = 0;
        for id in ids {
            let n = conn.execute(
                "UPDATE insights SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, id],
            )?;
            if n > 0 {
                delete_edges_by_node(conn, &id)?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    pub fn get_recent_insights_in_window(
        conn: &Connection,
        exclude_id: &str,
        window_hours: f64,
        limit: i64,
    ) -> rusqlite::Result<Vec<Insight>> {
        let cutoff = format_timestamp(Utc::now() - chrono::Duration::seconds((window_hours * 3600.0) as i64));
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE id != ?1 AND deleted_at IS NULL AND created_at >= ?2
             ORDER BY created_at DESC LIMIT ?3"
        ))?;
        let rows = stmt.query_map(params![exclude_id, cutoff, limit], scan_insight)?;
        rows.collect()
    }

    pub fn get_latest_insight_by_source(conn: &Connection, source: &str, exclude_id: &str) -> rusqlite::Result<Option<Insight>> {
        conn.query_row(
            &format!(
                "SELECT {INSIGHT_COLUMNS} FROM insights WHERE source = ?1 AND id != ?2 AND deleted_at IS NULL
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![source, exclude_id],
            scan_insight,
        )
        .optional()
    }

    pub fn get_recent_active_insights(conn: &Connection, exclude_id: &str, limit: i64) -> rusqlite::Result<Vec<Insight>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE id != ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![exclude_id, limit], scan_insight)?;
        rows.collect()
    }

    pub fn get_stats(conn: &Connection) -> rusqlite::Result<Stats> {
        let mut stats = Stats::default();
        stats.total_insights = conn.query_row("SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL", [], |r| r.get(0))?;
        stats.deleted_insights = conn.query_row("SELECT COUNT(*) FROM insights WHERE deleted_at IS NOT NULL", [], |r| r.get(0))?;

        let mut stmt = conn.prepare("SELECT category, COUNT(*) FROM insights WHERE deleted_at IS NULL GROUP BY category")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (cat, count) = row?;
            stats.by_category.insert(cat, count);
        }

        stats.edge_count = conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
        stats.oplog_count = conn.query_row("SELECT COUNT(*) FROM oplog", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT je.value, COUNT(DISTINCT i.id) as cnt
             FROM insights i, json_each(i.entities) je
             WHERE i.deleted_at IS NULL
             GROUP BY je.value ORDER BY cnt DESC LIMIT 20",
        )?;
        if let Ok(rows) = stmt.query_map([], |r| Ok(EntityCount { entity: r.get(0)?, count: r.get(1)? })) {
            stats.top_entities = rows.filter_map(|r| r.ok()).collect();
        }

        Ok(stats)
    }

    pub fn update_embedding(conn: &Connection, id: &str, blob: &[u8]) -> rusqlite::Result<()> {
        let now = format_timestamp(Utc::now());
        conn.execute("UPDATE insights SET embedding = ?1, updated_at = ?2 WHERE id = ?3", params![blob, now, id])?;
        Ok(())
    }

    pub fn get_embedding(conn: &Connection, id: &str) -> rusqlite::Result<Option<Vec<u8>>> {
        Ok(conn
            .query_row(
                "SELECT embedding FROM insights WHERE id = ?1 AND deleted_at IS NULL",
                params![id],
                |r| r.get::<_, Option<Vec<u8>>>(0),
            )
            .optional()?
            .flatten())
    }

    pub fn get_all_embeddings(conn: &Connection) -> rusqlite::Result<Vec<(String, Vec<u8>)>> {
        let mut stmt =
            conn.prepare("SELECT id, embedding FROM insights WHERE deleted_at IS NULL AND embedding IS NOT NULL")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?.into_iter().filter(|(_, b)| !b.is_empty()).collect())
    }

    pub fn embedding_stats(conn: &Connection) -> rusqlite::Result<(i64, i64)> {
        let total = conn.query_row("SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL", [], |r| r.get(0))?;
        let embedded = conn.query_row(
            "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL AND embedding IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        Ok((total, embedded))
    }

    pub fn get_insights_without_embedding(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<Insight>> {
        let limit = if limit <= 0 { 100 } else { limit };
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE deleted_at IS NULL AND embedding IS NULL
             ORDER BY importance DESC, created_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], scan_insight)?;
        rows.collect()
    }

    pub fn insert_edge(conn: &Connection, e: &Edge) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO edges (source_id, target_id, edge_type, weight, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                e.source_id,
                e.target_id,
                e.edge_type.as_str(),
                e.weight,
                e.metadata.to_json(),
                format_timestamp(e.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_edges_by_node(conn: &Connection, node_id: &str) -> rusqlite::Result<Vec<Edge>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1
             UNION ALL
             SELECT {EDGE_COLUMNS} FROM edges WHERE target_id = ?1 AND source_id != ?1"
        ))?;
        let rows = stmt.query_map(params![node_id], scan_edge)?;
        rows.collect()
    }

    pub fn get_edges_by_node_and_type(conn: &Connection, node_id: &str, edge_type: EdgeType) -> rusqlite::Result<Vec<Edge>> {
        let t = edge_type.as_str();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1 AND edge_type = ?2
             UNION ALL
             SELECT {EDGE_COLUMNS} FROM edges WHERE target_id = ?1 AND edge_type = ?2 AND source_id != ?1"
        ))?;
        let rows = stmt.query_map(params![node_id, t], scan_edge)?;
        rows.collect()
    }

    pub fn get_edges_by_source_and_type(conn: &Connection, source_id: &str, edge_type: EdgeType) -> rusqlite::Result<Vec<Edge>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1 AND edge_type = ?2"))?;
        let rows = stmt.query_map(params![source_id, edge_type.as_str()], scan_edge)?;
        rows.collect()
    }

    pub fn find_insights_with_entity(conn: &Connection, entity: &str, exclude_id: &str, limit: i64) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT i.id FROM insights i, json_each(i.entities) je
             WHERE i.deleted_at IS NULL AND i.id != ?1 AND je.value = ?2
             ORDER BY i.created_at DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![exclude_id, entity, limit], |r| r.get::<_, String>(0))?;
        rows.collect()
    }

    pub fn count_insights_with_entity(conn: &Connection, entity: &str, exclude_id: &str) -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COUNT(DISTINCT i.id) FROM insights i, json_each(i.entities) je
             WHERE i.deleted_at IS NULL AND i.id != ?1 AND je.value = ?2",
            params![exclude_id, entity],
            |r| r.get(0),
        )
    }

    pub fn get_all_edges(conn: &Connection) -> rusqlite::Result<Vec<Edge>> {
        let mut stmt = conn.prepare(&format!("SELECT {EDGE_COLUMNS} FROM edges"))?;
        let rows = stmt.query_map([], scan_edge)?;
        rows.collect()
    }

    /// Best-effort: failures are logged, never surfaced to the caller.
    pub fn log_op(conn: &Connection, operation: &str, insight_id: &str, detail: &str) {
        let now = format_timestamp(Utc::now());
        if let Err(e) = conn.execute(
            "INSERT INTO oplog (operation, insight_id, detail, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![operation, insight_id, detail, now],
        ) {
            tracing::warn!(error = %e, "oplog insert failed");
        }

        if let Err(e) = conn.execute(
            "DELETE FROM oplog WHERE id <= (SELECT MAX(id) FROM oplog) - ?1",
            params![crate::oplog::MAX_OPLOG_ENTRIES],
        ) {
            tracing::warn!(error = %e, "oplog trim failed");
        }
    }

    pub fn get_oplog(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<OplogEntry>> {
        let limit = if limit <= 0 { 20 } else { limit };
        let mut stmt =
            conn.prepare("SELECT id, operation, insight_id, detail, created_at FROM oplog ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit], |r| {
            Ok(OplogEntry {
                id: r.get(0)?,
                operation: r.get(1)?,
                insight_id: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
                detail: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
                created_at: r.get(4)?,
            })
        })?;
        rows.collect()
    }
}

/// A single opened store's SQLite connection plus an in-transaction
/// flag rejecting nesting.
pub struct Store {
    conn: Mutex<Connection>,
    in_tx: Mutex<bool>,
    pub path: std::path::PathBuf,
}

impl Store {
    /// Open (or create) the database at `data_dir/mnemon.db`, running
    /// migrations.
    pub fn open(data_dir: &std::path::Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("mnemon.db");
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;
        migrations::run(&conn)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        Ok(Self { conn: Mutex::new(conn), in_tx: Mutex::new(false), path })
    }

    /// Open an existing database read-only: no WAL setup, no
    /// migrations. Fails if the database file does not already exist.
    pub fn open_read_only(data_dir: &std::path::Path) -> Result<Self> {
        let path = data_dir.join("mnemon.db");
        let conn = Connection::open_with_flags(&path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.execute_batch("PRAGMA busy_timeout=5000;")?;
        Ok(Self { conn: Mutex::new(conn), in_tx: Mutex::new(false), path })
    }

    /// Run `f` inside a single `BEGIN IMMEDIATE` transaction, rolling
    /// back on any error (including one raised by `f` itself). Nested
    /// calls are rejected rather than silently flattened. `f` receives
    /// the connection directly — call `queries::*` functions with it,
    /// never a `Store` method, or this deadlocks.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        {
            let mut in_tx = self.in_tx.lock().unwrap();
            if *in_tx {
                return Err(StoreError::NestedTransaction);
            }
            *in_tx = true;
        }

        let conn = self.conn.lock().unwrap();
        let run = || -> Result<T> {
            conn.execute("BEGIN IMMEDIATE", [])?;
            match f(&conn) {
                Ok(v) => {
                    conn.execute("COMMIT", [])?;
                    Ok(v)
                }
                Err(e) => {
                    let _ = conn.execute("ROLLBACK", []);
                    Err(e)
                }
            }
        };
        let result = run();
        *self.in_tx.lock().unwrap() = false;
        result
    }

    /// Run `f` against the locked connection outside of a transaction —
    /// for ad hoc reads/writes (oplog entries, candidate discovery) that
    /// don't need `in_transaction`'s atomicity.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        Ok(f(&conn)?)
    }

    pub fn insert_edge(&self, conn: &Connection, e: &Edge) -> Result<()> {
        Ok(queries::insert_edge(conn, e)?)
    }

    pub fn delete_edges_by_node(&self, conn: &Connection, node_id: &str) -> Result<()> {
        Ok(queries::delete_edges_by_node(conn, node_id)?)
    }

    pub fn get_insight(&self, id: &str) -> Result<Option<Insight>> {
        self.with_conn(|conn| queries::get_insight(conn, id))
    }

    pub fn get_insight_include_deleted(&self, id: &str) -> Result<Option<Insight>> {
        self.with_conn(|conn| queries::get_insight_include_deleted(conn, id))
    }

    pub fn get_all_active_insights(&self) -> Result<Vec<Insight>> {
        self.with_conn(queries::get_all_active_insights)
    }

    pub fn query_insights(&self, keyword: &str, category: &str, min_importance: u8, source: &str, limit: i64) -> Result<Vec<Insight>> {
        self.with_conn(|conn| queries::query_insights(conn, keyword, category, min_importance, source, limit))
    }

    pub fn soft_delete_insight(&self, conn: &Connection, id: &str) -> Result<()> {
        queries::soft_delete_insight(conn, id)
    }

    pub fn update_entities(&self, conn: &Connection, id: &str, entities: &[String]) -> Result<()> {
        Ok(queries::update_entities(conn, id, entities)?)
    }

    pub fn increment_access_count(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| queries::increment_access_count(conn, id))
    }

    pub fn boost_retention(&self, id: &str) -> Result<()> {
        self.with_conn(|_| Ok(())).and_then(|_| {
            let conn = self.conn.lock().unwrap();
            queries::boost_retention(&conn, id)
        })
    }

    pub fn refresh_effective_importance(&self, conn: &Connection, id: &str) -> Result<f64> {
        queries::refresh_effective_importance(conn, id)
    }

    pub fn get_retention_candidates(&self, threshold: f64, limit: i64) -> Result<(Vec<RetentionCandidate>, i64)> {
        let conn = self.conn.lock().unwrap();
        queries::get_retention_candidates(&conn, threshold, limit)
    }

    pub fn count_active_insights(&self) -> Result<i64> {
        self.with_conn(queries::count_active_insights)
    }

    pub fn auto_prune(&self, conn: &Connection, max_insights: i64, exclude_ids: &[String]) -> Result<i64> {
        Ok(queries::auto_prune(conn, max_insights, exclude_ids)?)
    }

    pub fn get_recent_insights_in_window(&self, exclude_id: &str, window_hours: f64, limit: i64) -> Result<Vec<Insight>> {
        self.with_conn(|conn| queries::get_recent_insights_in_window(conn, exclude_id, window_hours, limit))
    }

    pub fn get_latest_insight_by_source(&self, source: &str, exclude_id: &str) -> Result<Option<Insight>> {
        self.with_conn(|conn| queries::get_latest_insight_by_source(conn, source, exclude_id))
    }

    pub fn get_recent_active_insights(&self, exclude_id: &str, limit: i64) -> Result<Vec<Insight>> {
        self.with_conn(|conn| queries::get_recent_active_insights(conn, exclude_id, limit))
    }

    pub fn get_stats(&self) -> Result<Stats> {
        self.with_conn(queries::get_stats)
    }

    pub fn update_embedding(&self, id: &str, blob: &[u8]) -> Result<()> {
        self.with_conn(|conn| queries::update_embedding(conn, id, blob))
    }

    pub fn get_embedding(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| queries::get_embedding(conn, id))
    }

    pub fn get_all_embeddings(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.with_conn(queries::get_all_embeddings)
    }

    pub fn embedding_stats(&self) -> Result<(i64, i64)> {
        self.with_conn(queries::embedding_stats)
    }

    pub fn get_insights_without_embedding(&self, limit: i64) -> Result<Vec<Insight>> {
        self.with_conn(|conn| queries::get_insights_without_embedding(conn, limit))
    }

    pub fn get_edges_by_node(&self, node_id: &str) -> Result<Vec<Edge>> {
        self.with_conn(|conn| queries::get_edges_by_node(conn, node_id))
    }

    pub fn get_edges_by_node_and_type(&self, node_id: &str, edge_type: EdgeType) -> Result<Vec<Edge>> {
        self.with_conn(|conn| queries::get_edges_by_node_and_type(conn, node_id, edge_type))
    }

    pub fn get_edges_by_source_and_type(&self, source_id: &str, edge_type: EdgeType) -> Result<Vec<Edge>> {
        self.with_conn(|conn| queries::get_edges_by_source_and_type(conn, source_id, edge_type))
    }

    pub fn find_insights_with_entity(&self, entity: &str, exclude_id: &str, limit: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| queries::find_insights_with_entity(conn, entity, exclude_id, limit))
    }

    pub fn count_insights_with_entity(&self, entity: &str, exclude_id: &str) -> Result<i64> {
        self.with_conn(|conn| queries::count_insights_with_entity(conn, entity, exclude_id))
    }

    pub fn get_all_edges(&self) -> Result<Vec<Edge>> {
        self.with_conn(queries::get_all_edges)
    }

    pub fn log_op(&self, conn: &Connection, operation: &str, insight_id: &str, detail: &str) {
        queries::log_op(conn, operation, insight_id, detail)
    }

    pub fn get_oplog(&self, limit: i64) -> Result<Vec<OplogEntry>> {
        self.with_conn(|conn| queries::get_oplog(conn, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn open_tmp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn reopening_an_existing_store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = Store::open(dir.path()).unwrap();
        let ins = Insight::new("survives a restart".into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        first.in_transaction(|conn| Ok(queries::insert_insight(conn, &ins)?)).unwrap();
        drop(first);

        let second = Store::open(dir.path()).unwrap();
        let fetched = second.get_insight(&ins.id).unwrap().unwrap();
        assert_eq!(fetched.content, "survives a restart");

        // A third open against the same schema must not error either.
        let third = Store::open(dir.path()).unwrap();
        assert_eq!(third.count_active_insights().unwrap(), 1);
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let (_dir, store) = open_tmp();
        let ins = Insight::new("hello".into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &ins)?)).unwrap();

        let fetched = store.get_insight(&ins.id).unwrap().unwrap();
        assert_eq!(fetched.content, "hello");
        assert_eq!(fetched.importance, 3);
    }

    #[test]
    fn soft_delete_removes_from_active_and_cascades_edges() {
        let (_dir, store) = open_tmp();
        let a = Insight::new("a".into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        let b = Insight::new("b".into(), Category::Fact, 3, vec![], vec![], "user".into()).unwrap();
        store
            .in_transaction(|conn| {
                queries::insert_insight(conn, &a)?;
                queries::insert_insight(conn, &b)?;
                let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeType::Temporal, 1.0, EdgeMetadata::default()).unwrap();
                Ok(queries::insert_edge(conn, &edge)?)
            })
            .unwrap();

        store.in_transaction(|conn| queries::soft_delete_insight(conn, &a.id)).unwrap();
        assert!(store.get_insight(&a.id).unwrap().is_none());
        assert!(store.get_edges_by_node(&b.id).unwrap().is_empty());
    }

    #[test]
    fn nested_transaction_is_rejected() {
        let (_dir, store) = open_tmp();
        let result = store.in_transaction(|_conn| store.in_transaction(|_inner| Ok(())));
        assert!(matches!(result, Err(StoreError::NestedTransaction)));
    }

    #[test]
    fn auto_prune_respects_capacity_and_immunity() {
        let (_dir, store) = open_tmp();
        store
            .in_transaction(|conn| {
                for i in 0..3 {
                    let ins =
                        Insight::new(format!("low {i}"), Category::Fact, 1, vec![], vec![], "user".into()).unwrap();
                    queries::insert_insight(conn, &ins)?;
                }
                let important =
                    Insight::new("important".into(), Category::Fact, 5, vec![], vec![], "user".into()).unwrap();
                Ok(queries::insert_insight(conn, &important)?)
            })
            .unwrap();

        let pruned = store.in_transaction(|conn| Ok(queries::auto_prune(conn, 2, &[])?)).unwrap();
        assert!(pruned > 0);
        assert!(store.count_active_insights().unwrap() <= 4);
    }

    #[test]
    fn auto_prune_exact_counts_over_capacity() {
        let (_dir, store) = open_tmp();
        store
            .in_transaction(|conn| {
                for i in 0..5 {
                    let ins =
                        Insight::new(format!("low value note {i}"), Category::Fact, 2, vec![], vec![], "user".into())
                            .unwrap();
                    queries::insert_insight(conn, &ins)?;
                }
                Ok(())
            })
            .unwrap();

        let pruned = store.in_transaction(|conn| Ok(queries::auto_prune(conn, 3, &[])?)).unwrap();
        assert_eq!(pruned, 2);
        assert_eq!(store.count_active_insights().unwrap(), 3);
    }

    #[test]
    fn auto_prune_skips_immune_insights() {
        let (_dir, store) = open_tmp();
        store
            .in_transaction(|conn| {
                let high = Insight::new("critical decision".into(), Category::Decision, 4, vec![], vec![], "user".into())
                    .unwrap();
                queries::insert_insight(conn, &high)?;
                let highest = Insight::new("another critical decision".into(), Category::Decision, 5, vec![], vec![], "user".into())
                    .unwrap();
                queries::insert_insight(conn, &highest)?;
                let low = Insight::new("minor note".into(), Category::Fact, 1, vec![], vec![], "user".into()).unwrap();
                queries::insert_insight(conn, &low)?;
                Ok(())
            })
            .unwrap();

        let pruned = store.in_transaction(|conn| Ok(queries::auto_prune(conn, 1, &[])?)).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(store.count_active_insights().unwrap(), 2);
    }
}
