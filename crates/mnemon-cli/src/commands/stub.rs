//! `mnemon viz` / `mnemon setup` — not implemented by this engine build.
//!
//! Graph visualization (DOT/HTML export) and interactive LLM-host
//! installation are separate concerns layered on top of this library
//! by other tools; this build reports that plainly rather than failing.

pub fn not_implemented(command: &str) -> serde_json::Value {
    serde_json::json!({
        "status": "not_implemented",
        "command": command,
        "message": format!("{command} is not implemented by this engine build"),
    })
}
