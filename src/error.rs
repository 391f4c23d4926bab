use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("destination {path:?} is unreachable: {source}")]
    DestinationUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("insufficient space: {free} bytes free, {safety_margin} bytes reserved as margin")]
    InsufficientSpace { free: u64, safety_margin: u64 },

    #[error("destination has {free} bytes free, at least {minimum} bytes required")]
    BelowMinimumFree { free: u64, minimum: u64 },

    #[error("source {path:?} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Precondition failures abort the run before any copy starts.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::DestinationUnreachable { .. }
                | Self::InsufficientSpace { .. }
                | Self::BelowMinimumFree { .. }
        )
    }
}
