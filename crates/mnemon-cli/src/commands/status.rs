//! `mnemon status` — aggregate store statistics plus on-disk size.

use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(ctx: &Context) -> Result<serde_json::Value, CliError> {
    let store = ctx.open_store()?;
    let stats = store.get_stats().map_err(MnemonError::from)?;

    let db_path = store.path.join("mnemon.db");
    let db_size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let mut value = serde_json::to_value(stats).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("dbPath".to_string(), serde_json::Value::String(db_path.display().to_string()));
        obj.insert("dbSizeBytes".to_string(), serde_json::Value::Number(db_size_bytes.into()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_core::model::Category;
    use mnemon_core::store::Store;
    use mnemon_core::store_manager::store_dir;
    use mnemon_core::write::{self, RememberRequest};

    #[test]
    fn status_reports_counts_and_db_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context { base_dir: dir.path().to_path_buf(), store_name: "test".into(), readonly: false };
        let store = Store::open(&store_dir(&ctx.base_dir, &ctx.store_name)).unwrap();

        let req = RememberRequest {
            content: "on-call rotation moved to pagerduty".into(),
            category: Category::parse("fact").unwrap(),
            importance: 3,
            tags: vec![],
            entities: vec![],
            source: "test".into(),
            embedding: None,
            skip_diff: true,
        };
        write::remember(&store, req).unwrap();

        let value = run(&ctx).unwrap();
        assert_eq!(value["dbPath"].as_str().unwrap().ends_with("mnemon.db"), true);
        assert!(value["dbSizeBytes"].as_u64().unwrap() > 0);
    }
}
