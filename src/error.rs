// Error taxonomy: transient ingest failures, host sampler failures, bad construction parameters.

use std::path::PathBuf;
use thiserror::Error;

/// A single filesystem event could not be turned into telemetry.
/// Always recovered by dropping the item; never aborts the aggregator.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{}: extension is not watched", .path.display())]
    Unwatched { path: PathBuf },

    #[error("stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse gps batch: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The host-stats collaborator failed; the last published snapshot stays authoritative.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("host stats io: {0}")]
    Io(#[from] std::io::Error),

    #[error("host stats parse: {0}")]
    Parse(String),

    #[error("host stats unsupported: {0}")]
    Unsupported(&'static str),

    #[error("host stats lock poisoned")]
    Poisoned,

    #[error("host stats task join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Invalid construction parameter. Fatal at startup, before any task runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frame window length must be > 0")]
    ZeroWindow,

    #[error("gps retention must be > 0")]
    ZeroRetention,
}
