use std::path::PathBuf;
use thiserror::Error;

/// Failures that end the process: everything before the listener opens,
/// and releasing the session after it closes.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Configuration(Vec<&'static str>),

    #[error("failed to prepare cache directory {}", path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to budget server at {url}")]
    Connection {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load budget {sync_id}")]
    BudgetLoad {
        sync_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to release budget session")]
    Shutdown {
        #[source]
        source: anyhow::Error,
    },
}
