//! # fenix-inject Bridge
//!
//! adb plumbing: builds the bridge command prefix (device selector and the
//! Termux-on-Samsung fwmark workaround), forwards a local socket to the
//! target app's debugger socket for the lifetime of one operation, and
//! guarantees teardown.

mod error;
mod session;

pub use error::BridgeError;
pub use session::{with_session, AdbBridge, Fwmark, REMOTE_SOCKET_SUFFIX};
