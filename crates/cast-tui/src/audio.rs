//! Audio playback seam.
//!
//! The player core talks to an [`AudioBackend`] and never to mpv directly,
//! so tests can script playback and a different engine can be swapped in.
//! The real implementation drives an `mpv --idle` child over its JSON IPC
//! socket: commands are fire-and-forget writes, observed properties
//! (`time-pos`, `pause`) stream back on the same socket and are cached for
//! synchronous reads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The playback surface the player depends on.  `play` may be refused by
/// the engine (nothing loaded yet, resume blocked); callers log and move on.
pub trait AudioBackend: Send {
    /// Load `url`, paused, at position zero.
    fn load(&mut self, url: &str) -> anyhow::Result<()>;
    fn play(&mut self) -> anyhow::Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, secs: f64);
    /// Last observed playback position in seconds.
    fn position(&self) -> f64;
    fn is_paused(&self) -> bool;
}

/// Silent fallback when no engine is available: state tracking without
/// sound, so browsing and sync still work on a machine without mpv.
#[derive(Debug, Default)]
pub struct NullAudio {
    position: f64,
    paused: bool,
}

impl AudioBackend for NullAudio {
    fn load(&mut self, url: &str) -> anyhow::Result<()> {
        debug!("null audio: load {}", url);
        self.position = 0.0;
        self.paused = true;
        Ok(())
    }

    fn play(&mut self) -> anyhow::Result<()> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn stop(&mut self) {
        self.paused = true;
        self.position = 0.0;
    }

    fn seek(&mut self, secs: f64) {
        self.position = secs;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

// ── observe_property ids ──────────────────────────────────────────────────────

const OBS_PAUSE: u64 = 1;
const OBS_TIME_POS: u64 = 2;

/// Observed mpv properties, updated by the reader task, read synchronously
/// by the backend.
#[derive(Debug, Default)]
struct Observed {
    /// f64 bits of the last `time-pos` value.
    position_bits: AtomicU64,
    paused: AtomicBool,
}

impl Observed {
    fn set_position(&self, secs: f64) {
        self.position_bits.store(secs.to_bits(), Ordering::Relaxed);
    }

    fn position(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Relaxed))
    }
}

pub struct MpvAudio {
    cmd_tx: mpsc::UnboundedSender<String>,
    observed: Arc<Observed>,
    process: tokio::process::Child,
}

impl MpvAudio {
    /// Spawn an idle mpv process and connect to its IPC socket.
    pub async fn spawn() -> anyhow::Result<Self> {
        let binary = cast_proto::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let socket_path = std::path::PathBuf::from(cast_proto::platform::mpv_socket_name());
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning {:?}", binary);
        let process = tokio::process::Command::new(&binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--quiet")
            .arg(cast_proto::platform::mpv_socket_arg())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        // Wait for the IPC socket to appear.
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();

        let observed = Arc::new(Observed::default());
        observed.paused.store(true, Ordering::Relaxed);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(writer_task(write_half, cmd_rx));
        tokio::spawn(reader_task(BufReader::new(read_half), observed.clone()));

        let audio = Self {
            cmd_tx,
            observed,
            process,
        };

        // Register the properties the player snapshots.
        audio.send_cmd(json!(["observe_property", OBS_PAUSE, "pause"]));
        audio.send_cmd(json!(["observe_property", OBS_TIME_POS, "time-pos"]));

        Ok(audio)
    }

    fn send_cmd(&self, command: Value) {
        let mut line = json!({ "command": command }).to_string();
        line.push('\n');
        if self.cmd_tx.send(line).is_err() {
            warn!("mpv: writer task gone, dropping command");
        }
    }
}

impl Drop for MpvAudio {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
    }
}

impl AudioBackend for MpvAudio {
    fn load(&mut self, url: &str) -> anyhow::Result<()> {
        self.send_cmd(json!(["loadfile", url, "replace"]));
        self.send_cmd(json!(["set_property", "pause", true]));
        self.observed.set_position(0.0);
        self.observed.paused.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn play(&mut self) -> anyhow::Result<()> {
        self.send_cmd(json!(["set_property", "pause", false]));
        self.observed.paused.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn pause(&mut self) {
        self.send_cmd(json!(["set_property", "pause", true]));
        self.observed.paused.store(true, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        self.send_cmd(json!(["stop"]));
        self.observed.set_position(0.0);
        self.observed.paused.store(true, Ordering::Relaxed);
    }

    fn seek(&mut self, secs: f64) {
        self.send_cmd(json!(["seek", secs, "absolute"]));
        self.observed.set_position(secs);
    }

    fn position(&self) -> f64 {
        self.observed.position()
    }

    fn is_paused(&self) -> bool {
        self.observed.paused.load(Ordering::Relaxed)
    }
}

async fn writer_task(
    mut writer: tokio::net::unix::OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = rx.recv().await {
        debug!("mpv writer: {}", line.trim());
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

async fn reader_task(mut reader: BufReader<tokio::net::unix::OwnedReadHalf>, observed: Arc<Observed>) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };
                handle_event(&val, &observed);
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                break;
            }
        }
    }
}

fn handle_event(val: &Value, observed: &Observed) {
    if val.get("event").and_then(|e| e.as_str()) != Some("property-change") {
        return;
    }
    let Some(id) = val.get("id").and_then(|v| v.as_u64()) else {
        return;
    };
    let data = val.get("data").unwrap_or(&Value::Null);
    match id {
        OBS_PAUSE => {
            if let Some(paused) = data.as_bool() {
                observed.paused.store(paused, Ordering::Relaxed);
            }
        }
        OBS_TIME_POS => {
            if let Some(secs) = data.as_f64() {
                observed.set_position(secs);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_changes_update_observed() {
        let observed = Observed::default();

        handle_event(
            &json!({ "event": "property-change", "id": OBS_TIME_POS, "data": 42.5 }),
            &observed,
        );
        assert_eq!(observed.position(), 42.5);

        handle_event(
            &json!({ "event": "property-change", "id": OBS_PAUSE, "data": true }),
            &observed,
        );
        assert!(observed.paused.load(Ordering::Relaxed));

        // Null data (file unloaded) leaves the last value in place.
        handle_event(
            &json!({ "event": "property-change", "id": OBS_TIME_POS, "data": null }),
            &observed,
        );
        assert_eq!(observed.position(), 42.5);

        // Unrelated events are ignored.
        handle_event(&json!({ "event": "end-file" }), &observed);
        assert_eq!(observed.position(), 42.5);
    }
}
