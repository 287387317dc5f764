use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An output or error-output destination could not be opened while
    /// building the engine.
    #[error("failed to open log destination {path:?}: {source}")]
    OpenDestination {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync log destination {path:?}: {source}")]
    Sync {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("global logger is already configured")]
    AlreadyConfigured,

    #[error("invalid severity {0:?}, expected one of debug, info, warning, error, fatal")]
    InvalidSeverity(String),

    #[error("invalid timestamp {input:?}: {source}")]
    InvalidTime {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}
