use crate::app::events::{Event, PlayerEvent};
use anyhow::Context;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
    process::{Child, Command},
    sync::mpsc,
};

#[derive(Debug)]
pub struct MpvHandle {
    child: Child,
    socket_path: PathBuf,
    writer: tokio::sync::Mutex<tokio::io::WriteHalf<UnixStream>>,
    request_id: AtomicU64,
}

impl MpvHandle {
    pub async fn spawn(
        event_tx: mpsc::Sender<Event>,
        audio_device: Option<&str>,
        log_file: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let socket_path =
            std::env::temp_dir().join(format!("mice-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let mut cmd = Command::new("mpv");
        cmd.args([
            "--no-video",
            "--idle=yes",
            "--input-terminal=no",
            "--really-quiet",
            "--audio-display=no",
            "--cache=yes",
        ]);
        if let Some(dev) = audio_device {
            cmd.arg(format!("--audio-device={dev}"));
        }
        if let Some(p) = log_file {
            cmd.arg(format!("--log-file={}", p.display()));
        }
        let child = cmd
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("spawn mpv")?;

        let stream = connect_with_retry(&socket_path).await?;
        let (reader, writer) = tokio::io::split(stream);
        tokio::spawn(read_events_loop(reader, event_tx));

        let this = Self {
            child,
            socket_path,
            writer: tokio::sync::Mutex::new(writer),
            request_id: AtomicU64::new(1),
        };

        this.command(json!({"command": ["request_log_messages", "warn"]}))
            .await?;
        for (id, prop) in [(1, "time-pos"), (2, "duration"), (3, "pause")] {
            this.command(json!({"command": ["observe_property", id, prop]}))
                .await?;
        }
        tracing::info!(socket = %this.socket_path.display(), "mpv started");
        Ok(this)
    }

    /// Replace whatever is playing. `start` and `pause` apply to this file only.
    pub async fn load_url(&self, url: &str, start_at: f64, paused: bool) -> anyhow::Result<()> {
        self.set_pause(paused).await?;
        let start = if start_at > 0.0 {
            format!("{start_at:.3}")
        } else {
            "none".to_string()
        };
        self.command(json!({"command": ["set_property", "start", start]}))
            .await?;
        self.command(json!({"command": ["loadfile", url, "replace"]}))
            .await
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.command(json!({"command": ["set_property", "pause", paused]}))
            .await
    }

    pub async fn seek_absolute(&self, seconds: f64) -> anyhow::Result<()> {
        self.command(json!({"command": ["seek", seconds, "absolute"]}))
            .await
    }

    pub async fn set_volume(&self, volume_0_100: u8) -> anyhow::Result<()> {
        self.command(json!({"command": ["set_property", "volume", volume_0_100]}))
            .await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.command(json!({"command": ["stop"]})).await
    }

    async fn command(&self, mut v: Value) -> anyhow::Result<()> {
        // Tagged requests get their errors echoed back on the event stream.
        if v.get("request_id").is_none() {
            let id = self.request_id.fetch_add(1, Ordering::Relaxed);
            if let Value::Object(ref mut o) = v {
                o.insert("request_id".to_string(), Value::from(id));
            }
        }
        let mut w = self.writer.lock().await;
        let mut line = serde_json::to_vec(&v).context("encode mpv json")?;
        line.push(b'\n');
        w.write_all(&line).await.context("write mpv ipc")?;
        w.flush().await.context("flush mpv ipc")?;
        Ok(())
    }
}

impl Drop for MpvHandle {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn connect_with_retry(path: &Path) -> anyhow::Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        match UnixStream::connect(path).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if tokio::time::Instant::now() > deadline {
                    return Err(e)
                        .with_context(|| format!("connect to mpv ipc {}", path.display()));
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }
}

async fn read_events_loop(reader: tokio::io::ReadHalf<UnixStream>, event_tx: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(v) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if let Some(pe) = map_mpv_event(&v)
            && event_tx.send(Event::Player(pe)).await.is_err()
        {
            break;
        }
    }
    tracing::debug!("mpv event stream closed");
}

/// Translate one IPC message into a player event.
///
/// Only `end-file` with reason `eof` counts as a finished song; `stop` is
/// what mpv reports when `loadfile replace` interrupts the previous file.
pub(crate) fn map_mpv_event(v: &Value) -> Option<PlayerEvent> {
    // Replies to our own commands.
    if v.get("request_id").is_some() {
        let err = v.get("error")?.as_str()?;
        return (err != "success").then(|| PlayerEvent::Warning(format!("mpv ipc: {err}")));
    }

    match v.get("event")?.as_str()? {
        "property-change" => {
            let data = v.get("data")?;
            match v.get("name")?.as_str()? {
                "time-pos" => Some(PlayerEvent::Position {
                    seconds: data.as_f64()?,
                }),
                "duration" => Some(PlayerEvent::Duration {
                    seconds: data.as_f64()?,
                }),
                "pause" => Some(if data.as_bool()? {
                    PlayerEvent::Paused
                } else {
                    PlayerEvent::Started
                }),
                _ => None,
            }
        }
        "file-loaded" => Some(PlayerEvent::Loaded),
        "end-file" => match v.get("reason").and_then(Value::as_str).unwrap_or("") {
            "eof" => Some(PlayerEvent::Ended),
            "error" => {
                let err = v.get("file_error").or_else(|| v.get("error"));
                let err = err.and_then(Value::as_str).unwrap_or("unknown");
                Some(PlayerEvent::Error(format!("playback failed: {err}")))
            }
            _ => None,
        },
        "log-message" => {
            let level = v.get("level").and_then(Value::as_str).unwrap_or("info");
            let text = v.get("text").and_then(Value::as_str).unwrap_or("").trim();
            if matches!(level, "warn" | "error" | "fatal") && !text.is_empty() {
                Some(PlayerEvent::Warning(format!("mpv {level}: {text}")))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(s: &str) -> Option<PlayerEvent> {
        map_mpv_event(&serde_json::from_str(s).unwrap())
    }

    #[test]
    fn property_changes() {
        assert!(matches!(
            map(r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#),
            Some(PlayerEvent::Position { seconds }) if seconds == 12.5
        ));
        assert!(matches!(
            map(r#"{"event":"property-change","id":3,"name":"pause","data":true}"#),
            Some(PlayerEvent::Paused)
        ));
        // Idle mpv reports no position.
        assert!(map(r#"{"event":"property-change","id":1,"name":"time-pos"}"#).is_none());
    }

    #[test]
    fn only_eof_ends_a_song() {
        assert!(matches!(
            map(r#"{"event":"end-file","reason":"eof"}"#),
            Some(PlayerEvent::Ended)
        ));
        assert!(map(r#"{"event":"end-file","reason":"stop"}"#).is_none());
        assert!(matches!(
            map(r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#),
            Some(PlayerEvent::Error(msg)) if msg.contains("loading failed")
        ));
        assert!(matches!(map(r#"{"event":"file-loaded"}"#), Some(PlayerEvent::Loaded)));
    }

    #[test]
    fn command_errors_and_logs_are_warnings() {
        assert!(map(r#"{"request_id":4,"error":"success"}"#).is_none());
        assert!(matches!(
            map(r#"{"request_id":5,"error":"property unavailable"}"#),
            Some(PlayerEvent::Warning(_))
        ));
        assert!(matches!(
            map(r#"{"event":"log-message","level":"error","prefix":"ffmpeg","text":"HTTP 404\n"}"#),
            Some(PlayerEvent::Warning(msg)) if msg.ends_with("HTTP 404")
        ));
    }
}
