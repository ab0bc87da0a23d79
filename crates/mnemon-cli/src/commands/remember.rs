//! `mnemon remember` — store a new insight.

use mnemon_core::model::Category;
use mnemon_core::write::{self, RememberRequest};
use mnemon_core::MnemonError;

use crate::context::{block_on, Context};
use crate::error::CliError;

fn split_csv(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect()
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    ctx: &Context,
    content: String,
    category: String,
    importance: u8,
    tags: String,
    entities: String,
    source: String,
    no_diff: bool,
) -> Result<serde_json::Value, CliError> {
    let category = Category::parse(&category).map_err(MnemonError::from)?;
    let tags = split_csv(&tags);
    let entities = split_csv(&entities);

    let store = ctx.open_store()?;

    let embedding = block_on(async {
        let client = mnemon_core::embedding::Client::new();
        if client.available().await { client.embed(&content).await.ok() } else { None }
    });

    let req = RememberRequest { content, category, importance, tags, entities, source, embedding, skip_diff: no_diff };

    let outcome = write::remember(&store, req).map_err(MnemonError::from)?;
    Ok(serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context { base_dir: dir.path().to_path_buf(), store_name: "default".to_string(), readonly: false };
        (dir, ctx)
    }

    #[test]
    fn remember_rejects_unknown_category() {
        let (_dir, ctx) = test_ctx();
        let err = run(&ctx, "hello".into(), "nonsense".into(), 3, String::new(), String::new(), "cli".into(), false)
            .unwrap_err();
        assert!(err.to_string().contains("nonsense") || matches!(err, CliError::Engine(_)));
    }

    #[test]
    fn remember_stores_a_new_insight() {
        let (_dir, ctx) = test_ctx();
        let value = run(
            &ctx,
            "the build pipeline switched to buildkit".into(),
            "fact".into(),
            3,
            "ci, build".into(),
            String::new(),
            "cli".into(),
            true,
        )
        .unwrap();
        assert_eq!(value["skipped"], false);
        assert_eq!(value["insight"]["tags"], serde_json::json!(["ci", "build"]));
    }

    #[test]
    fn split_csv_trims_and_drops_empties() {
        assert_eq!(split_csv(" a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_csv("").is_empty());
    }
}
