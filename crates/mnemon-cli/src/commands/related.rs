//! `mnemon related` — breadth-first traversal from a starting insight.

use mnemon_core::bfs::{bfs, BfsOptions};
use mnemon_core::model::EdgeType;
use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(ctx: &Context, id: String, depth: usize, edge_type: Option<String>) -> Result<serde_json::Value, CliError> {
    let edge_filter = match edge_type {
        Some(s) => Some(EdgeType::parse(&s).map_err(MnemonError::from)?),
        None => None,
    };

    let store = ctx.open_store()?;
    let opts = BfsOptions { max_depth: depth, max_nodes: 0, edge_filter };

    let hits = store.with_conn(|conn| Ok(bfs(conn, &id, opts))).map_err(MnemonError::from)?;

    let results: Vec<serde_json::Value> = hits
        .into_iter()
        .map(|hit| {
            serde_json::json!({
                "id": hit.insight.id,
                "content": hit.insight.content,
                "category": hit.insight.category,
                "importance": hit.insight.importance,
                "depth": hit.hop,
                "viaEdgeType": hit.via_edge,
            })
        })
        .collect();

    Ok(serde_json::Value::Array(results))
}
