//! `mnemon search` — pure keyword/token-overlap search, no embeddings or graph traversal.

use mnemon_core::keyword_search;
use mnemon_core::store::queries;
use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(ctx: &Context, query: String, limit: usize) -> Result<serde_json::Value, CliError> {
    let store = ctx.open_store()?;

    let value = store
        .with_conn(|conn| {
            let insights = queries::get_all_active_insights(conn)?;
            let hits = keyword_search(&insights, &query, limit, None);

            let mut results = Vec::with_capacity(hits.len());
            for (insight, score) in &hits {
                queries::increment_access_count(conn, &insight.id)?;
                results.push(serde_json::json!({
                    "id": insight.id,
                    "content": insight.content,
                    "category": insight.category,
                    "importance": insight.importance,
                    "tags": insight.tags,
                    "score": score,
                }));
            }
            queries::log_op(conn, "search", "", &format!("query={query:?}"));
            Ok(serde_json::Value::Array(results))
        })
        .map_err(MnemonError::from)?;

    Ok(value)
}
