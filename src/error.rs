//! Crate-wide error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("shadow-swap error: {0}")]
    Swap(String),

    #[error("worker pool is shutting down")]
    PoolShuttingDown,
}
