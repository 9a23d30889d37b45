//! Runtime configuration.
//!
//! Defaults are overridable by an optional `config.toml` in the current
//! directory and, on top of that, by explicit CLI flags (see `src/bin/server.rs`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Process-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory that ingestion consumes files from. Files are deleted on
    /// successful flush.
    pub dump_dir: PathBuf,

    /// Directory holding the persistent store and, transiently, the shadow
    /// store during a reindex.
    pub data_dir: PathBuf,

    /// Directory of static files served at `GET /`.
    pub public_dir: PathBuf,

    /// Port the HTTP front end binds to.
    pub port: u16,

    /// Number of worker-pool threads serving query requests.
    pub num_workers: usize,

    /// Default `tracing` filter directive, e.g. "info" or "debug".
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dump_dir: PathBuf::from("dump"),
            data_dir: PathBuf::from("data"),
            public_dir: PathBuf::from("public"),
            port: 8080,
            num_workers: 4,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Name of the persistent store file within `data_dir`.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("document_store.db")
    }

    /// Name of the transient shadow store file within `data_dir`.
    pub fn shadow_path(&self) -> PathBuf {
        self.data_dir.join("temp_document_store.db")
    }

    /// Load a config, starting from defaults and layering `path` on top if
    /// it exists. Missing fields in the file keep their default value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let partial: PartialConfig =
            toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))?;

        let mut config = Self::default();
        partial.apply(&mut config);
        Ok(config)
    }
}

/// Mirror of [`Config`] with every field optional, so a `config.toml` only
/// needs to mention what it overrides.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    dump_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    public_dir: Option<PathBuf>,
    port: Option<u16>,
    num_workers: Option<usize>,
    log_level: Option<String>,
}

impl PartialConfig {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.dump_dir {
            config.dump_dir = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.public_dir {
            config.public_dir = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.num_workers {
            config.num_workers = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_paths() {
        let config = Config::default();
        assert_eq!(config.dump_dir, PathBuf::from("dump"));
        assert_eq!(config.store_path(), PathBuf::from("data/document_store.db"));
        assert_eq!(
            config.shadow_path(),
            PathBuf::from("data/temp_document_store.db")
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load("/nonexistent/config.toml").unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 9090\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.num_workers, 4);
    }
}
