//! Shadow-Swap Coordinator — performs a full reindex without taking reads
//! offline, by cloning the live store into a shadow file, ingesting against
//! the clone, then atomically retargeting the live path onto it (§4.7).
//!
//! Per §9's design notes, the coordinator tracks its phase as a small state
//! machine (`Mode`) rather than the original's loose boolean, and exposes
//! "the current store" as a single `RwLock<Arc<IndexStore>>` snapshot that
//! callers re-read at the start of every operation, rather than branching on
//! a flag to pick between two long-lived handles.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::Spider;
use crate::pool::Pool;
use crate::store::IndexStore;

/// Coordinator phase. `ShadowWriting` covers the window in which the
/// shadow store exists and is being ingested into; `Swapping` is the brief
/// window after the pool has been paused and drained but before the live
/// path has been retargeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    LiveOnly,
    ShadowWriting,
    Swapping,
}

pub struct Coordinator {
    config: Config,
    current: RwLock<Arc<IndexStore>>,
    mode: Mutex<Mode>,
}

impl Coordinator {
    pub fn new(config: Config, live_store: IndexStore) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(live_store)),
            mode: Mutex::new(Mode::LiveOnly),
        }
    }

    /// The store all readers and writers should currently use. Callers take
    /// a fresh snapshot for each operation rather than holding it across a
    /// `reindex_with_swap` call.
    pub fn current_store(&self) -> Arc<IndexStore> {
        Arc::clone(&self.current.read())
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock()
    }

    /// Ingest the dump directory directly into whatever store is currently
    /// live, with no shadow involved. Used for the server's first reindex
    /// on startup when the store is empty (§6 CLI contract).
    pub fn reindex_in_place(&self) -> Result<()> {
        let store = self.current_store();
        let mut spider = Spider::new(&self.config.dump_dir);
        spider.reindex_batch(&store)?;
        Ok(())
    }

    /// Run a full reindex via the shadow-swap protocol: clone the live
    /// store, ingest into the clone while queries keep being served from it,
    /// then quiesce the pool and retarget the live path onto the clone.
    pub fn reindex_with_swap(&self, pool: &Pool) -> Result<()> {
        let live = self.current_store();
        *self.mode.lock() = Mode::ShadowWriting;

        let shadow_path = self.config.shadow_path();
        let shadow = match self.ingest_shadow(&shadow_path) {
            Ok(shadow) => shadow,
            Err(err) => {
                warn!(%err, "shadow reindex failed, aborting swap");
                *self.current.write() = live;
                let _ = std::fs::remove_file(&shadow_path);
                *self.mode.lock() = Mode::LiveOnly;
                return Err(err);
            }
        };

        *self.mode.lock() = Mode::Swapping;
        pool.pause();
        pool.drain();

        match self.promote_shadow(live, &shadow_path) {
            Ok(reopened) => {
                *self.current.write() = Arc::new(reopened);
                *self.mode.lock() = Mode::LiveOnly;
                pool.resume();
                info!("shadow swap complete");
                Ok(())
            }
            Err(err) => {
                // The window between drain and rename is the one non-atomic
                // step the design accepts the risk on (§4.7); `shadow` is
                // still the current store, so queries keep being served.
                warn!(%err, "swap failed after drain, leaving shadow store live");
                *self.mode.lock() = Mode::LiveOnly;
                pool.resume();
                let _ = shadow; // keep the shadow handle alive as the fallback live store
                Err(err)
            }
        }
    }

    fn ingest_shadow(&self, shadow_path: &Path) -> Result<Arc<IndexStore>> {
        let live = self.current_store();
        live.backup_to(shadow_path)?;

        let shadow = Arc::new(IndexStore::open(shadow_path)?);
        *self.current.write() = Arc::clone(&shadow);

        let mut spider = Spider::new(&self.config.dump_dir);
        spider.reindex_batch(&shadow)?;
        Ok(shadow)
    }

    /// Close the live store, delete its file, rename the shadow file onto
    /// the live path, and reopen it. Must only run with the pool drained —
    /// no other thread may hold a handle to the file being replaced (§5).
    fn promote_shadow(&self, live: Arc<IndexStore>, shadow_path: &Path) -> Result<IndexStore> {
        let live_path = self.config.store_path();
        drop(live);

        if live_path.exists() {
            std::fs::remove_file(&live_path).map_err(|e| {
                Error::Swap(format!("failed to remove live store file: {e}"))
            })?;
        }
        std::fs::rename(shadow_path, &live_path)
            .map_err(|e| Error::Swap(format!("failed to rename shadow into place: {e}")))?;

        IndexStore::open(&live_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingMatrix;
    use tempfile::tempdir;

    fn write_dump(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn test_config(root: &Path) -> Config {
        Config {
            dump_dir: root.join("dump"),
            data_dir: root.join("data"),
            public_dir: root.join("public"),
            port: 0,
            num_workers: 1,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn reindex_in_place_populates_live_store() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("dump")).unwrap();
        write_dump(
            &root.path().join("dump"),
            "a.txt",
            "http://a\n---URL---\n<body>hello world</body>",
        );

        let config = test_config(root.path());
        let live = IndexStore::open(config.store_path()).unwrap();
        let coordinator = Coordinator::new(config, live);

        coordinator.reindex_in_place().unwrap();
        assert_eq!(coordinator.current_store().count_documents().unwrap(), 1);
    }

    #[test]
    fn swap_replaces_live_file_and_keeps_serving() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("dump")).unwrap();

        let config = test_config(root.path());
        let live = IndexStore::open(config.store_path()).unwrap();
        let matrix = StagingMatrix::from_tokens(&["seed".to_string()]);
        live.flush_document("http://seed", &matrix).unwrap();
        live.set_total_documents(live.count_documents().unwrap()).unwrap();

        let coordinator = Coordinator::new(config.clone(), live);
        let pool = Pool::new(1);

        write_dump(
            &root.path().join("dump"),
            "a.txt",
            "http://a\n---URL---\n<body>hello world</body>",
        );

        coordinator.reindex_with_swap(&pool).unwrap();

        assert_eq!(coordinator.mode(), Mode::LiveOnly);
        let store = coordinator.current_store();
        assert_eq!(store.count_documents().unwrap(), 2);
        assert!(config.store_path().exists());
        assert!(!config.shadow_path().exists());
    }

    /// §8 scenario 6: a client polling `search` throughout a shadow-swap
    /// reindex must only ever observe the store from one side of the swap
    /// at a time — never a handle that's been torn down mid-query. Driven
    /// by a fixed iteration count rather than wall-clock sleeps so the test
    /// doesn't depend on timing to exercise the race.
    #[test]
    fn reindex_during_read_never_observes_a_torn_down_store() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("dump")).unwrap();

        let config = test_config(root.path());
        let live = IndexStore::open(config.store_path()).unwrap();
        let matrix = StagingMatrix::from_tokens(&["cat".to_string()]);
        live.flush_document("http://seed", &matrix).unwrap();
        live.set_total_documents(live.count_documents().unwrap()).unwrap();

        let coordinator = Arc::new(Coordinator::new(config.clone(), live));
        let pool = Arc::new(Pool::new(2));

        for i in 0..20 {
            write_dump(
                &root.path().join("dump"),
                &format!("doc{i}.txt"),
                &format!("http://doc{i}\n---URL---\n<body>cat dog {i}</body>"),
            );
        }

        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let poller_coordinator = Arc::clone(&coordinator);
        let poller_stop = Arc::clone(&stop);
        let poller = std::thread::spawn(move || {
            while !poller_stop.load(std::sync::atomic::Ordering::SeqCst) {
                let store = poller_coordinator.current_store();
                // Every query against whatever store is currently live must
                // succeed and return a well-formed result set; a torn-down
                // handle would surface as an I/O or SQL error here instead
                // of a clean empty/non-empty result.
                let hits = crate::query::search(&store, "cat").unwrap();
                assert!(hits.iter().all(|h| !h.document_name.is_empty()));
            }
        });

        coordinator.reindex_with_swap(&pool).unwrap();
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
        poller.join().unwrap();

        assert_eq!(coordinator.mode(), Mode::LiveOnly);
        assert_eq!(coordinator.current_store().count_documents().unwrap(), 21);
    }

    #[test]
    fn failed_backup_leaves_live_store_intact_and_mode_resets() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("dump")).unwrap();

        let config = test_config(root.path());
        let live = IndexStore::open(config.store_path()).unwrap();
        let matrix = StagingMatrix::from_tokens(&["seed".to_string()]);
        live.flush_document("http://seed", &matrix).unwrap();
        live.set_total_documents(live.count_documents().unwrap()).unwrap();

        // Pre-occupy the shadow path with a directory so opening it as a
        // SQLite connection fails, forcing `ingest_shadow` to error out.
        std::fs::create_dir_all(config.shadow_path()).unwrap();

        let coordinator = Coordinator::new(config.clone(), live);
        let pool = Pool::new(1);

        let result = coordinator.reindex_with_swap(&pool);
        assert!(result.is_err());
        assert_eq!(coordinator.mode(), Mode::LiveOnly);
        assert_eq!(coordinator.current_store().count_documents().unwrap(), 1);
    }
}
