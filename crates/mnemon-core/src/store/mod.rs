//! SQLite-backed persistence: schema migrations and the [`Store`] CRUD
//! surface.

mod migrations;
mod sqlite;

pub use sqlite::{EntityCount, OplogEntry, RetentionCandidate, Stats, Store, StoreError, queries};
