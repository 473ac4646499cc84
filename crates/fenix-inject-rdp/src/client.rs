//! Debugger connection with per-actor reply matching.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use crate::error::RdpError;
use crate::transport::{self, PacketReader, PacketWriter, TransportAddress};

type Responder = oneshot::Sender<Result<Value, RdpError>>;

#[derive(Default)]
struct PendingTable {
    queues: HashMap<String, VecDeque<Responder>>,
    closed: bool,
}

/// A connection to the debugger server.
///
/// Firefox's protocol carries no request ids: replies come back in request
/// order per destination actor. The client keeps one FIFO of pending
/// responders per actor; a packet that matches no pending request is
/// broadcast to event subscribers. When the connection ends, every
/// outstanding responder is failed with [`RdpError::ConnectionLost`] so
/// nothing waits forever.
pub struct DebuggerClient {
    writer: Arc<tokio::sync::Mutex<PacketWriter>>,
    pending: Arc<Mutex<PendingTable>>,
    events: broadcast::Sender<Value>,
    hello: Value,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl DebuggerClient {
    /// Connect and consume the root hello packet.
    pub async fn connect(addr: &TransportAddress) -> Result<Self, RdpError> {
        let (mut reader, writer) = transport::connect(addr).await?;

        let hello = reader.read_packet().await?;
        if hello.get("from").and_then(Value::as_str) != Some("root") {
            return Err(RdpError::UnexpectedReply(format!(
                "first packet did not come from root: {hello}"
            )));
        }
        debug!(application = ?hello.get("applicationType"), "connected to debugger");

        let pending: Arc<Mutex<PendingTable>> = Arc::default();
        let (events, _) = broadcast::channel(64);

        let recv_task = {
            let pending = pending.clone();
            let events = events.clone();
            tokio::spawn(async move {
                Self::receive_loop(reader, pending, events).await;
            })
        };

        Ok(Self {
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            pending,
            events,
            hello,
            _recv_task: recv_task,
        })
    }

    /// The hello packet the server sent on connect.
    pub fn hello(&self) -> &Value {
        &self.hello
    }

    async fn receive_loop(
        mut reader: PacketReader,
        pending: Arc<Mutex<PendingTable>>,
        events: broadcast::Sender<Value>,
    ) {
        loop {
            let packet = match reader.read_packet().await {
                Ok(packet) => packet,
                Err(e) => {
                    debug!("connection ended: {e}");
                    break;
                }
            };

            let Some(from) = packet.get("from").and_then(Value::as_str).map(str::to_string)
            else {
                warn!("dropping packet without sender: {packet}");
                continue;
            };

            let responder = pending
                .lock()
                .expect("pending table poisoned")
                .queues
                .get_mut(&from)
                .and_then(VecDeque::pop_front);

            match responder {
                Some(tx) => {
                    let error = packet.get("error").and_then(Value::as_str).map(|error| {
                        packet
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or(error)
                            .to_string()
                    });
                    let result = match error {
                        Some(message) => Err(RdpError::Protocol {
                            actor: from,
                            message,
                        }),
                        None => Ok(packet),
                    };
                    let _ = tx.send(result);
                }
                // not a reply to anything we asked; hand it to subscribers
                None => {
                    let _ = events.send(packet);
                }
            }
        }

        // fail everything still waiting rather than hanging forever
        let mut table = pending.lock().expect("pending table poisoned");
        table.closed = true;
        for (_, queue) in table.queues.drain() {
            for tx in queue {
                let _ = tx.send(Err(RdpError::ConnectionLost));
            }
        }
    }

    /// Send `packet` to the actor `to` and wait for its next reply.
    pub async fn request(&self, to: &str, packet: Value) -> Result<Value, RdpError> {
        let mut packet = packet;
        match packet.as_object_mut() {
            Some(map) => {
                map.insert("to".to_string(), Value::String(to.to_string()));
            }
            None => {
                return Err(RdpError::UnexpectedReply(
                    "request packet must be a JSON object".to_string(),
                ));
            }
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.pending.lock().expect("pending table poisoned");
            if table.closed {
                return Err(RdpError::ConnectionLost);
            }
            table
                .queues
                .entry(to.to_string())
                .or_default()
                .push_back(tx);
        }

        let write_result = {
            let mut writer = self.writer.lock().await;
            writer.write_packet(&packet).await
        };
        if let Err(e) = write_result {
            // the request never went out; withdraw its responder
            if let Some(queue) = self
                .pending
                .lock()
                .expect("pending table poisoned")
                .queues
                .get_mut(to)
            {
                queue.pop_back();
            }
            return Err(e);
        }

        rx.await.map_err(|_| RdpError::ConnectionLost)?
    }

    /// Subscribe to unsolicited packets (events).
    pub fn events(&self) -> broadcast::Receiver<Value> {
        self.events.subscribe()
    }
}

impl Drop for DebuggerClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
