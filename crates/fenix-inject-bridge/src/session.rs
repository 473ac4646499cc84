//! adb invocation and the scoped socket-forwarding session.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// The abstract socket GeckoView-based browsers listen on, scoped per app.
pub const REMOTE_SOCKET_SUFFIX: &str = "firefox-debugger-socket";

/// Whether to wrap adb in the Termux-on-Samsung fwmark workaround.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fwmark {
    On,
    Off,
    /// Probe the local device's manufacturer.
    Auto,
}

/// One resolved adb invocation: workaround wrapper, executable, device
/// selector.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    argv: Vec<String>,
}

impl AdbBridge {
    /// Build the adb command prefix for this run.
    pub async fn new(fwmark: Fwmark, device: Option<&str>) -> Self {
        let no_fwmark = match fwmark {
            Fwmark::On => true,
            Fwmark::Off => false,
            Fwmark::Auto => probe_samsung().await,
        };

        let mut argv: Vec<String> = Vec::new();
        if no_fwmark {
            argv.extend(
                ["env", "ANDROID_NO_USE_FWMARK_CLIENT=1", "fakeroot"]
                    .into_iter()
                    .map(String::from),
            );
        }
        argv.push("adb".to_string());
        if let Some(device) = device {
            argv.push("-s".to_string());
            argv.push(device.to_string());
        }
        debug!(?argv, "bridge command prefix");
        Self { argv }
    }

    /// Use an explicit command prefix instead of the standard adb one.
    pub fn with_command(argv: Vec<String>) -> Self {
        assert!(!argv.is_empty(), "bridge command prefix cannot be empty");
        Self { argv }
    }

    /// The full invocation prefix, wrapper included.
    pub fn command(&self) -> &[String] {
        &self.argv
    }

    /// `adb forward localfilesystem:<local> localabstract:<remote>`.
    pub async fn forward(&self, local: &Path, remote: &str) -> Result<(), BridgeError> {
        self.run_checked(&[
            "forward",
            &format!("localfilesystem:{}", local.display()),
            &format!("localabstract:{remote}"),
        ])
        .await
    }

    /// `adb forward --remove localfilesystem:<local>`.
    pub async fn remove_forward(&self, local: &Path) -> Result<(), BridgeError> {
        self.run_checked(&[
            "forward",
            "--remove",
            &format!("localfilesystem:{}", local.display()),
        ])
        .await
    }

    /// Nudge the target app to open a view via its launcher intent.
    pub async fn launch_app(&self, app: &str) -> Result<(), BridgeError> {
        self.run_checked(&[
            "shell",
            "monkey",
            "-p",
            app,
            "-c",
            "android.intent.category.LAUNCHER",
            "1",
        ])
        .await
    }

    async fn run_checked(&self, args: &[&str]) -> Result<(), BridgeError> {
        let describe = || format!("{} {}", self.argv.join(" "), args.join(" "));

        let mut command = Command::new(&self.argv[0]);
        command
            .args(&self.argv[1..])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = %describe(), "running bridge command");
        let output = command.output().await.map_err(|source| BridgeError::Spawn {
            command: describe(),
            source,
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BridgeError::Command {
                command: describe(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Termux on Samsung needs the fwmark workaround; a failed probe means no
/// workaround.
async fn probe_samsung() -> bool {
    let output = Command::new("getprop")
        .arg("ro.product.manufacturer")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await;
    match output {
        Ok(output) => String::from_utf8_lossy(&output.stdout)
            .trim()
            .eq_ignore_ascii_case("samsung"),
        Err(_) => false,
    }
}

/// Forward a socket to `app`'s debugger socket, run `body` with the local
/// socket path, then tear everything down.
///
/// The remove-forward command and the temp directory cleanup run on every
/// exit path. A teardown failure only surfaces when the body succeeded; a
/// body error is never masked by one.
pub async fn with_session<T, E, F, Fut>(
    bridge: &AdbBridge,
    app: &str,
    body: F,
) -> Result<T, E>
where
    E: From<BridgeError>,
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let dir = tempfile::Builder::new()
        .prefix("fenix-inject-")
        .tempdir()
        .map_err(BridgeError::from)?;
    let socket = dir.path().join("adb.sock");
    let remote = format!("{app}/{REMOTE_SOCKET_SUFFIX}");

    info!(socket = %socket.display(), %remote, "forwarding debugger socket");
    let forwarded = bridge.forward(&socket, &remote).await;

    let outcome = match forwarded {
        Ok(()) => body(socket.clone()).await,
        Err(e) => Err(E::from(e)),
    };

    let teardown = bridge.remove_forward(&socket).await;
    drop(dir);

    match (outcome, teardown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(E::from(e)),
        (Err(e), Err(teardown_err)) => {
            warn!("bridge teardown failed after an earlier error: {teardown_err}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
