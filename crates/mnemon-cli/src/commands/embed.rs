//! `mnemon embed` — report embedding coverage, backfill missing vectors, or embed one insight.

use mnemon_core::embedding::Client;
use mnemon_core::store::queries;
use mnemon_core::vector::serialize_vector;
use mnemon_core::MnemonError;

use crate::context::{block_on, Context};
use crate::error::CliError;

pub fn run(ctx: &Context, status: bool, all: bool, id: Option<String>) -> Result<serde_json::Value, CliError> {
    if !status && !all && id.is_none() {
        return Err(CliError::usage("embed requires one of --status, --all, or an insight id"));
    }

    let store = ctx.open_store()?;
    let client = Client::new();

    if status {
        let (embedded, total) = store.embedding_stats().map_err(MnemonError::from)?;
        let available = block_on(client.available());
        let coverage = if total > 0 { embedded as f64 / total as f64 } else { 0.0 };
        return Ok(serde_json::json!({
            "embedded": embedded,
            "total": total,
            "coveragePct": coverage * 100.0,
            "serverAvailable": available,
            "model": client.model(),
            "endpoint": client.endpoint(),
        }));
    }

    if !block_on(client.available()) {
        return Err(CliError::usage(client.unavailable_message()));
    }

    if all {
        let pending = store.get_insights_without_embedding(1000).map_err(MnemonError::from)?;
        let mut succeeded = 0i64;
        let mut failed = 0i64;
        for insight in &pending {
            let result = block_on(client.embed(&insight.content));
            match result {
                Ok(vec) => {
                    store.update_embedding(&insight.id, &serialize_vector(&vec)).map_err(MnemonError::from)?;
                    succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, insight_id = %insight.id, "embedding backfill failed");
                    failed += 1;
                }
            }
        }
        return Ok(serde_json::json!({ "status": "backfilled", "attempted": pending.len(), "succeeded": succeeded, "failed": failed }));
    }

    let id = id.expect("checked above");
    let insight = store.get_insight(&id).map_err(MnemonError::from)?.ok_or_else(|| CliError::usage(format!("insight {id:?} not found")))?;
    let vec = block_on(client.embed(&insight.content)).map_err(mnemon_core::MnemonError::from)?;
    store.update_embedding(&id, &serialize_vector(&vec)).map_err(MnemonError::from)?;

    let _ = store.with_conn(|conn| {
        queries::log_op(conn, "embed", &id, "");
        Ok(())
    });

    Ok(serde_json::json!({ "status": "embedded", "id": id, "dimensions": vec.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_core::store_manager::store_dir;

    fn test_ctx() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context { base_dir: dir.path().to_path_buf(), store_name: "test".into(), readonly: false };
        let _ = mnemon_core::store::Store::open(&store_dir(&ctx.base_dir, &ctx.store_name)).unwrap();
        (dir, ctx)
    }

    #[test]
    fn embed_requires_a_mode_flag() {
        let (_dir, ctx) = test_ctx();
        let err = run(&ctx, false, false, None).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn embed_status_reports_zero_coverage_on_empty_store() {
        let (_dir, ctx) = test_ctx();
        let value = run(&ctx, true, false, None).unwrap();
        assert_eq!(value["embedded"], 0);
        assert_eq!(value["total"], 0);
    }
}
