use color_eyre::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub music_dir: PathBuf,
    pub theme: String,
    pub volume: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_dir: dirs::audio_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            theme: "catppuccin-mocha".to_string(),
            volume: 0.8,
        }
    }
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quaver").join("config.toml"))
    }

    /// Loads the config file, falling back to defaults when it's missing.
    /// A malformed file also falls back, with a warning, rather than
    /// refusing to start.
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!("malformed config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }
}
