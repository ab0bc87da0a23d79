//! The one output contract every subcommand follows: a single JSON
//! document on stdout, two-space indented. `serde_json::Value`'s map is
//! a `BTreeMap` by default (this crate does not enable the
//! `preserve_order` feature), so keys come out sorted for free.

use crate::error::CliError;

pub fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string()));
}

pub fn print_error(err: &CliError) {
    let value = serde_json::json!({ "error": { "message": err.to_string() } });
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
}
