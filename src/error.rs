use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for decoding, rendering and playback.
///
/// Every variant is fatal to the job that raised it: errors surface to the
/// caller and are never retried internally.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A path could not be opened, read or written.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The container or codec could not be probed or decoded.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The stream format is degenerate or inconsistent with the chain.
    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    /// The playback stream or output device failed to initialize.
    #[error("failed to start audio engine: {0}")]
    EngineStart(String),

    /// The offline render failed mid-flight.
    #[error("render failed: {0}")]
    Render(String),

    /// A render job is already running on this processor.
    #[error("a render job is already in flight")]
    Busy,
}

impl ProcessError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProcessError::FileAccess {
            path: path.into(),
            source,
        }
    }
}
