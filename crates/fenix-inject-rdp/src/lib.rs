//! # fenix-inject RDP
//!
//! A small Firefox remote debugging protocol client: framed-JSON transport
//! over TCP or a local socket, per-actor reply matching with a
//! connection-lost broadcast, and the actor walk down to the target app's
//! main-process console.

mod actors;
mod client;
mod error;
mod transport;

pub use actors::{
    resolve_main_process, ActorHandle, ProcessTarget, FRAME_WAIT, GECKOVIEW_ROOT_URL,
};
pub use client::DebuggerClient;
pub use error::RdpError;
pub use transport::{PacketReader, PacketWriter, TransportAddress};
