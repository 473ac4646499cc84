//! Protocol client errors.

use thiserror::Error;

/// Errors from the debugger transport, client, or actor walk.
#[derive(Debug, Error)]
pub enum RdpError {
    /// The connection ended while requests were outstanding.
    #[error("Lost connection to the browser - is it set to allow remote debugging?")]
    ConnectionLost,

    /// A packet violated the `length:json` framing.
    #[error("Malformed packet frame: {0}")]
    Framing(String),

    /// The server answered a request with an error packet.
    #[error("Protocol error from {actor}: {message}")]
    Protocol { actor: String, message: String },

    /// A reply arrived without the field the walk needs.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The evaluated script threw inside the target.
    #[error("Remote evaluation failed: {0}")]
    Evaluation(String),

    /// No browser frame appeared in the target process in time.
    #[error("No browser frame appeared in the target process")]
    NoTargetFrame,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
