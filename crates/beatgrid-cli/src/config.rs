use std::path::{Path, PathBuf};

use beatgrid_core::{KitMap, Transport, DEFAULT_MAX_HISTORY};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sample_rate: u32,
    pub history_size: usize,
    pub grid: GridConfig,
    pub humanize: HumanizeConfig,
    pub kit: KitMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            history_size: DEFAULT_MAX_HISTORY,
            grid: GridConfig::default(),
            humanize: HumanizeConfig::default(),
            kit: KitMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub bpm: f64,
    /// Note division of one grid step (16 = sixteenth notes)
    pub division: u32,
    pub beats_per_bar: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { bpm: 120.0, division: 16, beats_per_bar: 4 }
    }
}

impl GridConfig {
    /// Grid step in seconds at the configured tempo
    pub fn grid_secs(&self) -> f64 {
        let transport = Transport { bpm: self.bpm, ..Transport::default() };
        transport.grid_secs(self.division)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeConfig {
    /// Max timing offset in seconds at amount 1.0
    pub timing: f64,
    /// Max velocity offset at amount 1.0
    pub velocity: f64,
}

impl Default for HumanizeConfig {
    fn default() -> Self {
        Self { timing: 0.01, velocity: 10.0 }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beatgrid")
        .join("config.toml")
}

/// Load `path` (or the default location); fall back to defaults on any problem.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), "Ignoring invalid config: {}", e);
            AppConfig::default()
        }
    }
}
