//! `mnemon forget` — soft-delete an insight by id.

use mnemon_core::store::queries;
use mnemon_core::MnemonError;

use crate::context::Context;
use crate::error::CliError;

pub fn run(ctx: &Context, id: String) -> Result<serde_json::Value, CliError> {
    let store = ctx.open_store()?;

    store
        .in_transaction(|conn| {
            queries::soft_delete_insight(conn, &id)?;
            queries::log_op(conn, "forget", &id, "");
            Ok(())
        })
        .map_err(MnemonError::from)?;

    Ok(serde_json::json!({ "id": id, "status": "deleted" }))
}
