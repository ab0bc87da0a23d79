//! Crate-level error type.
//!
//! Individual layers (`store`, `model`, `embedding`) define their own
//! `#[non_exhaustive]` error enums; this type unifies them behind one
//! `?`-composable surface for callers that don't need to match on the
//! originating layer, principally the CLI.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::model::ValidationError;
use crate::store::StoreError;
use crate::write::WriteError;

/// Top-level error type returned by the public engine API.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MnemonError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// A nested transaction scope was attempted.
    #[error("nested transaction on store {0:?}")]
    NestedTransaction(String),

    /// The active store pointer names a store that does not exist.
    #[error("active store {0:?} does not exist")]
    StoreMissing(String),
}

pub type Result<T> = std::result::Result<T, MnemonError>;
