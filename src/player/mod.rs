//! Audio output. Decoding and device handling are left to mpv.

pub mod mpv;

use anyhow::Context;

pub use mpv::MpvHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub description: String,
}

impl AudioDevice {
    pub fn auto() -> Self {
        Self {
            name: "auto".into(),
            description: "Autoselect device".into(),
        }
    }
}

/// Ask mpv which outputs exist.
pub async fn list_audio_devices() -> anyhow::Result<Vec<AudioDevice>> {
    let out = tokio::process::Command::new("mpv")
        .args(["--audio-device=help", "--no-video", "--idle=no"])
        .output()
        .await
        .context("run mpv --audio-device=help")?;
    Ok(parse_audio_devices(&String::from_utf8_lossy(&out.stdout)))
}

/// Lines look like `  'pulse/alsa_output.x' (Built-in Audio)`.
pub fn parse_audio_devices(text: &str) -> Vec<AudioDevice> {
    let mut devices: Vec<AudioDevice> = text
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix('\'')?;
            let (name, tail) = rest.split_once('\'')?;
            let description = tail
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .to_string();
            Some(AudioDevice {
                name: name.to_string(),
                description,
            })
        })
        .collect();

    if !devices.iter().any(|d| d.name == "auto") {
        devices.insert(0, AudioDevice::auto());
    }
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mpv_device_list() {
        let text = "List of detected audio devices:\n  'auto' (Autoselect device)\n  'pulse/sink1' (Speakers)\n  'alsa/default' (Default (ALSA))\n";
        let devices = parse_audio_devices(text);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[1].name, "pulse/sink1");
        assert_eq!(devices[1].description, "Speakers");
    }

    #[test]
    fn empty_output_still_offers_auto() {
        assert_eq!(parse_audio_devices(""), vec![AudioDevice::auto()]);
    }
}
