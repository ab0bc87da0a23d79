//! `mnemon store` — manage named stores under the base data directory.

use mnemon_core::model::ValidationError;
use mnemon_core::store::Store;
use mnemon_core::store_manager::{list_stores, store_dir, store_exists, valid_store_name, write_active};
use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn list(ctx: &Context) -> Result<serde_json::Value, CliError> {
    let names = list_stores(&ctx.base_dir).map_err(|e| CliError::usage(e.to_string()))?;
    Ok(serde_json::json!({ "active": ctx.store_name, "stores": names }))
}

pub fn create(ctx: &Context, name: String) -> Result<serde_json::Value, CliError> {
    if !valid_store_name(&name) {
        return Err(MnemonError::from(ValidationError::InvalidStoreName(name)).into());
    }
    if store_exists(&ctx.base_dir, &name) {
        return Err(CliError::usage(format!("store {name:?} already exists")));
    }

    let dir = store_dir(&ctx.base_dir, &name);
    Store::open(&dir).map_err(MnemonError::from)?;

    Ok(serde_json::json!({ "status": "created", "name": name }))
}

pub fn set(ctx: &Context, name: String) -> Result<serde_json::Value, CliError> {
    if !store_exists(&ctx.base_dir, &name) {
        return Err(CliError::usage(format!("store {name:?} does not exist")));
    }
    write_active(&ctx.base_dir, &name).map_err(|e| CliError::usage(e.to_string()))?;
    Ok(serde_json::json!({ "status": "active", "name": name }))
}

pub fn remove(ctx: &Context, name: String) -> Result<serde_json::Value, CliError> {
    if !store_exists(&ctx.base_dir, &name) {
        return Err(CliError::usage(format!("store {name:?} does not exist")));
    }
    if name == ctx.store_name {
        return Err(CliError::usage(format!("cannot remove {name:?}: it is the active store")));
    }
    std::fs::remove_dir_all(store_dir(&ctx.base_dir, &name)).map_err(|e| CliError::usage(e.to_string()))?;
    Ok(serde_json::json!({ "status": "removed", "name": name }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context { base_dir: dir.path().to_path_buf(), store_name: "default".into(), readonly: false };
        (dir, ctx)
    }

    #[test]
    fn create_then_list_shows_new_store() {
        let (_dir, ctx) = test_ctx();
        let value = create(&ctx, "scratch".into()).unwrap();
        assert_eq!(value["status"], "created");

        let listed = list(&ctx).unwrap();
        let stores = listed["stores"].as_array().unwrap();
        assert!(stores.iter().any(|s| s == "scratch"));
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let (_dir, ctx) = test_ctx();
        create(&ctx, "scratch".into()).unwrap();
        let err = create(&ctx, "scratch".into()).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn create_rejects_invalid_name() {
        let (_dir, ctx) = test_ctx();
        let err = create(&ctx, "../evil".into()).unwrap_err();
        assert!(matches!(err, CliError::Engine(_)));
    }

    #[test]
    fn set_rejects_unknown_store() {
        let (_dir, ctx) = test_ctx();
        let err = set(&ctx, "ghost".into()).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn remove_rejects_active_store() {
        let (_dir, ctx) = test_ctx();
        create(&ctx, "default".into()).ok();
        let err = remove(&ctx, "default".into()).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn remove_deletes_inactive_store() {
        let (_dir, ctx) = test_ctx();
        create(&ctx, "scratch".into()).unwrap();
        let value = remove(&ctx, "scratch".into()).unwrap();
        assert_eq!(value["status"], "removed");
        assert!(!store_exists(&ctx.base_dir, "scratch"));
    }
}
