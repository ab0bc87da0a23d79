//! `mnemon link` — create a manual, bidirectional edge between two insights.

use mnemon_core::model::{Edge, EdgeMetadata, EdgeType};
use mnemon_core::store::queries;
use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(
    ctx: &Context,
    source_id: String,
    target_id: String,
    edge_type: String,
    weight: f64,
    meta: Option<String>,
) -> Result<serde_json::Value, CliError> {
    let edge_type = EdgeType::parse(&edge_type).map_err(MnemonError::from)?;

    if !(0.0..=1.0).contains(&weight) {
        return Err(CliError::usage(format!("weight must be between 0.0 and 1.0, got {weight}")));
    }

    let mut metadata = match &meta {
        Some(raw) => serde_json::from_str::<EdgeMetadata>(raw)
            .map_err(|e| CliError::usage(format!("invalid --meta JSON: {e}")))?,
        None => EdgeMetadata::default(),
    };
    metadata.created_by = Some("cli".to_string());

    let forward =
        Edge::new(&source_id, &target_id, edge_type, weight, metadata.clone()).map_err(MnemonError::from)?;
    let backward =
        Edge::new(&target_id, &source_id, edge_type, weight, metadata).map_err(MnemonError::from)?;

    let store = ctx.open_store()?;

    store
        .in_transaction(|conn| {
            if queries::get_insight(conn, &source_id)?.is_none() {
                return Err(mnemon_core::StoreError::NotFound(source_id.clone()));
            }
            if queries::get_insight(conn, &target_id)?.is_none() {
                return Err(mnemon_core::StoreError::NotFound(target_id.clone()));
            }

            queries::insert_edge(conn, &forward)?;
            queries::insert_edge(conn, &backward)?;
            queries::log_op(conn, "link", &source_id, &format!("{edge_type} -> {target_id} weight={weight}"));

            Ok(())
        })
        .map_err(MnemonError::from)?;

    Ok(serde_json::json!({
        "sourceId": source_id,
        "targetId": target_id,
        "edgeType": edge_type,
        "weight": weight,
        "status": "linked",
    }))
}
