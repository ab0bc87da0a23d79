//! `mnemon log` — recent oplog entries.

use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(ctx: &Context, limit: i64) -> Result<serde_json::Value, CliError> {
    let store = ctx.open_store()?;
    let entries = store.get_oplog(limit).map_err(MnemonError::from)?;
    Ok(serde_json::json!({ "entries": entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_core::model::Category;
    use mnemon_core::store::Store;
    use mnemon_core::store_manager::store_dir;
    use mnemon_core::write::{self, RememberRequest};

    #[test]
    fn log_reports_recent_operations() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context { base_dir: dir.path().to_path_buf(), store_name: "test".into(), readonly: false };
        let store = Store::open(&store_dir(&ctx.base_dir, &ctx.store_name)).unwrap();

        let req = RememberRequest {
            content: "feature flag rollout completed".into(),
            category: Category::parse("fact").unwrap(),
            importance: 3,
            tags: vec![],
            entities: vec![],
            source: "test".into(),
            embedding: None,
            skip_diff: true,
        };
        write::remember(&store, req).unwrap();

        let value = run(&ctx, 50).unwrap();
        assert!(!value["entries"].as_array().unwrap().is_empty());
    }
}
