//! Control socket: server (during `reelup upload`/`resume`) and client (for
//! `reelup pause`/`cancel`/`remove`/`resume`). Protocol: one line per
//! command, e.g. "pause <id>" or "resume <id> <absolute path>".

use anyhow::Result;
use reelup_core::control::ControlCommand;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

/// Spawns a task that listens on `path` and forwards each well-formed line
/// to `commands`. Malformed lines are logged and skipped.
pub fn spawn_control_listener(
    commands: mpsc::Sender<ControlCommand>,
    path: impl AsRef<Path>,
) -> tokio::task::JoinHandle<()> {
    let path = path.as_ref().to_path_buf();
    tokio::spawn(async move {
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket bind: {}", e);
                return;
            }
        };
        tracing::debug!(path = %path.display(), "control socket listening");
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let commands = commands.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            match ControlCommand::parse(&line) {
                                Some(cmd) => {
                                    if commands.send(cmd).await.is_err() {
                                        return;
                                    }
                                }
                                None => tracing::debug!(%line, "ignoring control line"),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    })
}

/// True if a session accepts connections on `socket_path`.
pub async fn session_listening(socket_path: &Path) -> bool {
    socket_path.exists() && UnixStream::connect(socket_path).await.is_ok()
}

/// Sends one command line to a running session. Returns `false` if no
/// session is listening.
pub async fn send_command(socket_path: &Path, cmd: ControlCommand) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        // Stale socket file from a session that did not clean up.
        Err(_) => return Ok(false),
    };
    stream.write_all(format!("{}\n", cmd).as_bytes()).await?;
    stream.shutdown().await?;
    Ok(true)
}
