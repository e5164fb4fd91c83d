//! Session configuration loaded from `~/.barline/config.yaml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arrangement::{TrackMeta, DEFAULT_SLOTS};
use crate::bar::DEFAULT_THRESHOLD;
use crate::midi::{DrumKitMap, ExportError};
use crate::osc::OscConfig;

pub const DEFAULT_BPM: f64 = 110.0;
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid drum kit: {0}")]
    Kit(#[source] ExportError),

    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("arrangements need at least one slot")]
    ZeroSlots,
}

/// Export metadata for a melodic track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub name: String,
    #[serde(default)]
    pub program: u8,
    #[serde(default)]
    pub pitch_offset: i32,
}

impl TrackConfig {
    fn bassline() -> Self {
        Self {
            name: "bassline".into(),
            program: 38,
            pitch_offset: 0,
        }
    }

    fn melody() -> Self {
        Self {
            name: "melody".into(),
            program: 80,
            pitch_offset: 0,
        }
    }

    /// Melodic tracks export on channel 0.
    pub fn meta(&self) -> TrackMeta {
        TrackMeta::new(self.name.clone(), 0, self.program, self.pitch_offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// Slots per arrangement, which is also the loop length in bars.
    #[serde(default = "default_slots")]
    pub slots: usize,
    /// Initial drum velocity gate.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Drum instrument name → note name. Grid rows follow the sorted names.
    #[serde(default = "default_kit")]
    pub drum_kit: BTreeMap<String, String>,
    #[serde(default = "TrackConfig::bassline")]
    pub bassline: TrackConfig,
    #[serde(default = "TrackConfig::melody")]
    pub melody: TrackConfig,
    #[serde(default)]
    pub osc: OscConfig,
}

fn default_bpm() -> f64 {
    DEFAULT_BPM
}

fn default_slots() -> usize {
    DEFAULT_SLOTS
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_kit() -> BTreeMap<String, String> {
    [("00_KD", "C2"), ("01_SD", "D2"), ("02_HH", "F#2")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            slots: default_slots(),
            threshold: default_threshold(),
            sample_rate: default_sample_rate(),
            drum_kit: default_kit(),
            bassline: TrackConfig::bassline(),
            melody: TrackConfig::melody(),
            osc: OscConfig::default(),
        }
    }
}

impl SessionConfig {
    /// `~/.barline/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(".barline").join("config.yaml"))
    }

    /// Load config from the standard path.
    /// Returns None if the file doesn't exist or doesn't parse or validate (graceful fallback).
    pub fn load() -> Option<Self> {
        Self::load_or_none(&Self::default_path()?)
    }

    fn load_or_none(path: &Path) -> Option<Self> {
        match Self::load_from(path) {
            Ok(config) => Some(config),
            Err(ConfigError::Io { .. }) => None,
            Err(e) => {
                log::warn!("ignoring {}: {e}", path.display());
                None
            }
        }
    }

    /// Load from an explicit path, reporting every failure.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the transport cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.slots == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        Ok(())
    }

    pub fn drum_kit(&self) -> Result<DrumKitMap, ConfigError> {
        DrumKitMap::from_note_names(&self.drum_kit).map_err(ConfigError::Kit)
    }
}
