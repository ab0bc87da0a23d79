//! Per-invocation configuration: which store to open and how.

use std::path::PathBuf;

use mnemon_core::store::Store;
use mnemon_core::store_manager::{resolve_base_dir, resolve_store_name, store_dir};

use crate::error::CliError;

pub struct Context {
    pub base_dir: PathBuf,
    pub store_name: String,
    pub readonly: bool,
}

impl Context {
    pub fn resolve(data_dir: Option<PathBuf>, store: Option<String>, readonly: bool) -> Self {
        let base_dir = resolve_base_dir(data_dir.as_deref());
        let store_name = resolve_store_name(&base_dir, store.as_deref());
        Self { base_dir, store_name, readonly }
    }

    pub fn store_dir(&self) -> PathBuf {
        store_dir(&self.base_dir, &self.store_name)
    }

    pub fn open_store(&self) -> Result<Store, CliError> {
        let opened =
            if self.readonly { Store::open_read_only(&self.store_dir()) } else { Store::open(&self.store_dir()) };
        Ok(opened.map_err(mnemon_core::MnemonError::from)?)
    }
}

/// Run a future to completion on a fresh multi-thread runtime, torn
/// down immediately after — the embedding client is the only async
/// surface in the engine and it is not worth keeping a runtime alive
/// for the rest of a CLI invocation.
pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to start embedding runtime")
        .block_on(fut)
}
