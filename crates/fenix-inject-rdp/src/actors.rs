//! Actor-tree walk: root → process descriptor → process target → console.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use crate::client::DebuggerClient;
use crate::error::RdpError;

/// Root document GeckoView loads in every Fenix-family app.
pub const GECKOVIEW_ROOT_URL: &str = "chrome://geckoview/content/geckoview.xhtml";

/// How long to wait for a frame after nudging the app to open a view.
pub const FRAME_WAIT: Duration = Duration::from_secs(2);

/// One remote actor on a shared connection.
#[derive(Clone)]
pub struct ActorHandle {
    client: Arc<DebuggerClient>,
    actor: String,
}

impl ActorHandle {
    pub fn new(client: Arc<DebuggerClient>, actor: impl Into<String>) -> Self {
        Self {
            client,
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Send a packet to this actor and wait for its reply.
    pub async fn request(&self, packet: Value) -> Result<Value, RdpError> {
        self.client.request(&self.actor, packet).await
    }
}

/// The target app's main-process target and its console sub-actor.
pub struct ProcessTarget {
    client: Arc<DebuggerClient>,
    target: ActorHandle,
    console: ActorHandle,
}

/// Walk the actor tree down to the main process target.
pub async fn resolve_main_process(
    client: Arc<DebuggerClient>,
) -> Result<ProcessTarget, RdpError> {
    let root = ActorHandle::new(client.clone(), "root");
    let reply = root.request(json!({"type": "getProcess", "id": 0})).await?;
    let descriptor = actor_field(&reply, &["processDescriptor", "actor"])?;
    debug!(%descriptor, "resolved process descriptor");

    let descriptor = ActorHandle::new(client.clone(), descriptor);
    let reply = descriptor.request(json!({"type": "getTarget"})).await?;
    let target = actor_field(&reply, &["process", "actor"])?;
    let console = actor_field(&reply, &["process", "consoleActor"])?;
    debug!(%target, %console, "resolved process target");

    Ok(ProcessTarget {
        target: ActorHandle::new(client.clone(), target),
        console: ActorHandle::new(client.clone(), console),
        client,
    })
}

impl ProcessTarget {
    pub fn console(&self) -> &ActorHandle {
        &self.console
    }

    /// Whether the target already shows the given root document.
    pub async fn has_frame(&self, url: &str) -> Result<bool, RdpError> {
        let reply = self.target.request(json!({"type": "listFrames"})).await?;
        Ok(frames_contain(reply.get("frames"), url))
    }

    /// Wait for a `frameUpdate` event carrying a matching frame.
    ///
    /// Subscribes first and re-lists once, so a frame appearing between the
    /// caller's check and this call is not missed. This is the only bounded
    /// wait in the protocol client.
    pub async fn wait_for_frame(&self, url: &str, wait: Duration) -> Result<(), RdpError> {
        let mut events = self.client.events();
        if self.has_frame(url).await? {
            return Ok(());
        }

        let matched = tokio::time::timeout(wait, async {
            loop {
                match events.recv().await {
                    Ok(packet) => {
                        if packet.get("from").and_then(Value::as_str) == Some(self.target.actor())
                            && packet.get("type").and_then(Value::as_str) == Some("frameUpdate")
                            && frames_contain(packet.get("frames"), url)
                        {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(RdpError::ConnectionLost);
                    }
                }
            }
        })
        .await;

        match matched {
            Ok(result) => result,
            Err(_) => Err(RdpError::NoTargetFrame),
        }
    }

    /// Run script text in the target and resolve its asynchronous result.
    pub async fn evaluate_js(&self, text: &str) -> Result<Value, RdpError> {
        // subscribe before the request so the result event cannot be missed
        let mut events = self.client.events();
        let reply = self
            .console
            .request(json!({
                "type": "evaluateJSAsync",
                "text": text,
                "mapped": {"await": true},
            }))
            .await?;
        let result_id = reply
            .get("resultID")
            .cloned()
            .ok_or_else(|| RdpError::UnexpectedReply("missing resultID".to_string()))?;

        loop {
            match events.recv().await {
                Ok(packet) => {
                    if packet.get("from").and_then(Value::as_str) == Some(self.console.actor())
                        && packet.get("type").and_then(Value::as_str) == Some("evaluationResult")
                        && packet.get("resultID") == Some(&result_id)
                    {
                        if let Some(message) =
                            packet.get("exceptionMessage").filter(|m| !m.is_null())
                        {
                            let text = message
                                .as_str()
                                .map(str::to_string)
                                .unwrap_or_else(|| message.to_string());
                            return Err(RdpError::Evaluation(text));
                        }
                        return Ok(packet.get("result").cloned().unwrap_or(Value::Null));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(RdpError::ConnectionLost),
            }
        }
    }
}

fn actor_field(reply: &Value, path: &[&str]) -> Result<String, RdpError> {
    let mut value = reply;
    for key in path {
        value = &value[*key];
    }
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RdpError::UnexpectedReply(format!("missing {}", path.join("."))))
}

fn frames_contain(frames: Option<&Value>, url: &str) -> bool {
    frames.and_then(Value::as_array).is_some_and(|frames| {
        frames
            .iter()
            .any(|f| f.get("url").and_then(Value::as_str) == Some(url))
    })
}

#[cfg(test)]
#[path = "actors_tests.rs"]
mod tests;
