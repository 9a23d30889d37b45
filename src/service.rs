//! Top-level service wiring — an explicitly constructed value owning the
//! store, worker pool, and shadow-swap coordinator, handed to collaborators
//! instead of the original's process-wide singleton (§9 "Global state").

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::pool::Pool;
use crate::query;
use crate::store::IndexStore;
use crate::types::SearchHit;

/// Owns every long-lived piece of the index/query system for one process.
pub struct Service {
    config: Config,
    coordinator: Coordinator,
    pool: Pool,
}

impl Service {
    /// Open (or create) the live store at `config.store_path()` and wire up
    /// the worker pool and coordinator around it.
    pub fn new(config: Config) -> Result<Self> {
        let live = IndexStore::open(config.store_path())?;
        let pool = Pool::new(config.num_workers);
        let coordinator = Coordinator::new(config.clone(), live);
        Ok(Self { config, coordinator, pool })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run the startup reindex described in §6's CLI contract: a plain
    /// in-place ingest when the store is empty, otherwise a shadow-swap
    /// reindex so any queries already in flight are not disrupted.
    pub fn startup_reindex(&self) -> Result<()> {
        let store = self.coordinator.current_store();
        if store.count_documents()? == 0 {
            info!("store is empty, reindexing in place");
            self.coordinator.reindex_in_place()
        } else {
            info!("store is populated, reindexing via shadow swap");
            self.coordinator.reindex_with_swap(&self.pool)
        }
    }

    /// Run one more shadow-swap reindex over whatever has newly arrived in
    /// the dump directory.
    pub fn reindex(&self) -> Result<()> {
        self.coordinator.reindex_with_swap(&self.pool)
    }

    /// Evaluate a query against whichever store is currently live, by
    /// dispatching the lookup onto a worker pool thread and waiting for the
    /// result.
    pub fn search(self: &Arc<Self>, query_text: String) -> Result<Vec<SearchHit>> {
        let service = Arc::clone(self);
        let (tx, rx) = std::sync::mpsc::channel();

        self.pool.submit(move || {
            let store = service.coordinator.current_store();
            let result = query::search(&store, &query_text);
            if tx.send(result).is_err() {
                warn!("query caller dropped its receiver before the worker finished");
            }
        })?;

        rx.recv().map_err(|_| {
            crate::error::Error::Swap("worker pool dropped the query task without a result".into())
        })?
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
