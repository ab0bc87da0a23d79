//! `mnemon recall` — intent-aware retrieval, or a `--basic` keyword/filter fallback.

use mnemon_core::recall::{intent::Intent, intent_aware_recall};
use mnemon_core::store::queries;
use mnemon_core::{extract_entities, MnemonError};

use crate::context::{block_on, Context};
use crate::error::CliError;

#[allow(clippy::too_many_arguments)]
pub fn run(
    ctx: &Context,
    query: String,
    limit: i64,
    intent: Option<String>,
    basic: bool,
    category: Option<String>,
    min_importance: u8,
    source: Option<String>,
) -> Result<serde_json::Value, CliError> {
    let store = ctx.open_store()?;

    if basic {
        let results = store
            .query_insights(&query, category.as_deref().unwrap_or(""), min_importance, source.as_deref().unwrap_or(""), limit)
            .map_err(MnemonError::from)?;

        let value = store
            .with_conn(|conn| {
                let mut out = Vec::with_capacity(results.len());
                for insight in &results {
                    queries::increment_access_count(conn, &insight.id)?;
                    queries::log_op(conn, "recall:basic", &insight.id, "");
                    out.push(insight);
                }
                let count = out.len();
                Ok(serde_json::json!({ "results": out, "meta": { "mode": "basic", "count": count } }))
            })
            .map_err(MnemonError::from)?;
        return Ok(value);
    }

    let intent_override = match intent.as_deref() {
        Some(s) => {
            Some(Intent::from_str_loose(s).ok_or_else(|| CliError::usage(format!("unknown intent override: {s}")))?)
        }
        None => None,
    };

    let query_entities = extract_entities(&query);

    let embedding = block_on(async {
        let client = mnemon_core::embedding::Client::new();
        if client.available().await { client.embed(&query).await.ok() } else { None }
    });

    let limit = if limit <= 0 { 10 } else { limit as usize };

    let result = store
        .with_conn(|conn| intent_aware_recall(conn, &query, embedding.as_deref(), &query_entities, limit, intent_override))
        .map_err(MnemonError::from)?;

    store
        .with_conn(|conn| {
            for hit in &result.results {
                queries::increment_access_count(conn, &hit.insight.id)?;
            }
            queries::log_op(conn, "recall", "", &format!("query={query:?} intent={}", result.meta.intent.as_str()));
            Ok(())
        })
        .map_err(MnemonError::from)?;

    Ok(serde_json::to_value(result).unwrap_or(serde_json::Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_core::model::Category;
    use mnemon_core::store::Store;
    use mnemon_core::store_manager::store_dir;
    use mnemon_core::write::{self, RememberRequest};

    fn test_ctx() -> (tempfile::TempDir, Context, Store) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context { base_dir: dir.path().to_path_buf(), store_name: "test".into(), readonly: false };
        let store = Store::open(&store_dir(&ctx.base_dir, &ctx.store_name)).unwrap();
        (dir, ctx, store)
    }

    fn seed(store: &Store, content: &str) {
        let req = RememberRequest {
            content: content.into(),
            category: Category::parse("fact").unwrap(),
            importance: 3,
            tags: vec![],
            entities: vec![],
            source: "test".into(),
            embedding: None,
            skip_diff: true,
        };
        write::remember(store, req).unwrap();
    }

    #[test]
    fn recall_basic_finds_matching_insight() {
        let (_dir, ctx, store) = test_ctx();
        seed(&store, "the deploy pipeline now runs on buildkit");

        let value = run(&ctx, "deploy".into(), 10, None, true, None, 0, None).unwrap();
        assert_eq!(value["meta"]["mode"], "basic");
        assert_eq!(value["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn recall_full_pipeline_returns_results_and_meta() {
        let (_dir, ctx, store) = test_ctx();
        seed(&store, "the payment service migrated to stripe webhooks");

        let value = run(&ctx, "payment service".into(), 5, None, false, None, 0, None).unwrap();
        assert!(!value["results"].as_array().unwrap().is_empty());
        assert!(value["meta"]["intent"].is_string());
    }

    #[test]
    fn recall_rejects_unknown_intent_override() {
        let (_dir, ctx, _store) = test_ctx();
        let err = run(&ctx, "anything".into(), 5, Some("nonsense".into()), false, None, 0, None).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }
}
