//! YAML configuration for the beatbox binary.

use anyhow::{anyhow, Context, Result};
use bb_master::{BeatMode, KitPaths, Settings, SinkConfig, DEFAULT_BPM, DEFAULT_VOLUME, MAX_VOICES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sounds: SoundsConfig,
    /// Output volume in percent (0-100)
    pub volume: i32,
    /// Tempo in bpm (40-300)
    pub tempo: i32,
    /// Pattern: none, rock or custom
    pub mode: String,
    pub audio: AudioConfig,
    /// Status line interval; 0 disables it
    pub status_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sounds: SoundsConfig::default(),
            volume: DEFAULT_VOLUME as i32,
            tempo: DEFAULT_BPM as i32,
            mode: "rock".into(),
            audio: AudioConfig::default(),
            status_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundsConfig {
    pub base: PathBuf,
    pub hihat: PathBuf,
    pub snare: PathBuf,
}

impl Default for SoundsConfig {
    fn default() -> Self {
        let paths = KitPaths::default();
        Self {
            base: paths.base,
            hihat: paths.hihat,
            snare: paths.snare,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Device buffering; blocks are a quarter of this
    pub latency_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let sink = SinkConfig::default();
        Self {
            sample_rate: sink.sample_rate,
            latency_ms: sink.latency_ms,
        }
    }
}

impl Config {
    /// Read and parse a YAML file. A named file that is missing or
    /// malformed is an error, not a silent fallback.
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("loading config from {:?}", path);
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn beat_mode(&self) -> Result<BeatMode> {
        self.mode.parse().map_err(|e: String| anyhow!(e))
    }

    /// Startup settings. Range checks happen when the machine starts.
    pub fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            volume: self.volume,
            tempo: self.tempo,
            mode: self.beat_mode()?,
            voices: MAX_VOICES,
            status_interval: (self.status_interval_ms > 0)
                .then(|| Duration::from_millis(self.status_interval_ms)),
            autoplay: true,
        })
    }

    pub fn kit_paths(&self) -> KitPaths {
        KitPaths {
            base: self.sounds.base.clone(),
            hihat: self.sounds.hihat.clone(),
            snare: self.sounds.snare.clone(),
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            sample_rate: self.audio.sample_rate,
            latency_ms: self.audio.latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.kit_paths(), KitPaths::default());
        assert_eq!(config.sink_config(), SinkConfig::default());

        let settings = config.settings().unwrap();
        assert_eq!(settings.volume, 80);
        assert_eq!(settings.tempo, 120);
        assert_eq!(settings.mode, BeatMode::Rock);
        assert_eq!(settings.status_interval, Some(Duration::from_secs(1)));
    }

    #[test]
    fn partial_file_overrides_fields() {
        let yaml = "
tempo: 90
mode: custom
sounds:
  snare: kit/snare.wav
audio:
  latency_ms: 20
status_interval_ms: 0
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.tempo, 90);
        assert_eq!(config.volume, 80);
        assert_eq!(config.sounds.snare, PathBuf::from("kit/snare.wav"));
        assert_eq!(config.sounds.base, KitPaths::default().base);
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.sink_config().block_size_hint(), 220);

        let settings = config.settings().unwrap();
        assert_eq!(settings.mode, BeatMode::Custom);
        assert_eq!(settings.status_interval, None);
    }

    #[test]
    fn unknown_mode_is_an_error() {
        let config = Config::from_yaml("mode: jazz").unwrap();
        assert!(config.settings().is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(Config::from_yaml("tempo: [fast").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/beatbox.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
