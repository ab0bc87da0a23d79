//! `mnemon gc` — list retention-pruning candidates, or retain one by id.

use mnemon_core::retention::MAX_INSIGHTS;
use mnemon_core::store::queries;
use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(ctx: &Context, keep: Option<String>, threshold: f64, limit: i64) -> Result<serde_json::Value, CliError> {
    let store = ctx.open_store()?;

    if let Some(id) = keep {
        let (access_count, ei, immune) = store
            .in_transaction(|conn| {
                queries::boost_retention(conn, &id)?;
                let ei = queries::refresh_effective_importance(conn, &id)?;
                queries::log_op(conn, "gc-keep", &id, "");
                let insight = queries::get_insight(conn, &id)?.ok_or_else(|| mnemon_core::StoreError::NotFound(id.clone()))?;
                Ok((insight.access_count, ei, insight.is_immune()))
            })
            .map_err(MnemonError::from)?;

        return Ok(serde_json::json!({
            "status": "retained",
            "id": id,
            "newAccessCount": access_count,
            "effectiveImportance": ei,
            "immune": immune,
        }));
    }

    let (candidates, total_insights) = store.get_retention_candidates(threshold, limit).map_err(MnemonError::from)?;

    let candidates: Vec<serde_json::Value> = candidates
        .into_iter()
        .map(|c| {
            serde_json::json!({
                "id": c.insight.id,
                "content": c.insight.content,
                "effectiveImportance": c.effective_importance,
                "daysSinceAccess": c.days_since_access,
                "edgeCount": c.edge_count,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "totalInsights": total_insights,
        "threshold": threshold,
        "candidatesFound": candidates.len(),
        "candidates": candidates,
        "maxInsights": MAX_INSIGHTS,
    }))
}
