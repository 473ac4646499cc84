//! Bridge errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge executable could not be started at all.
    #[error("Failed to spawn bridge command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The bridge command ran and reported failure.
    #[error("Bridge command `{command}` exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
