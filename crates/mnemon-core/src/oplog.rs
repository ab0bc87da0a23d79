//! Append-only operation log: bookkeeping constants shared with the
//! storage layer, which owns the actual insert/trim SQL.

/// Oplog entries beyond this count are trimmed after each insert.
pub const MAX_OPLOG_ENTRIES: i64 = 5_000;
