use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::scoring::BASELINE_PAUSE_MS;
use crate::session::{clamp_pause, Settings};
use crate::speech::{Voice, DEFAULT_SPEECH_COMMAND};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pause_ms: u64,
    pub reverse: bool,
    pub voice: Voice,
    pub speech_command: String,
    pub mute: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pause_ms: BASELINE_PAUSE_MS,
            reverse: false,
            voice: Voice::Default,
            speech_command: DEFAULT_SPEECH_COMMAND.to_string(),
            mute: false,
        }
    }
}

impl Config {
    pub fn settings(&self) -> Settings {
        Settings {
            pause_ms: clamp_pause(self.pause_ms),
            reverse: self.reverse,
            voice: self.voice,
        }
    }

    /// Folds in the settings the user changed during the run
    pub fn with_settings(self, settings: &Settings) -> Self {
        Self {
            pause_ms: settings.pause_ms,
            reverse: settings.reverse,
            voice: settings.voice,
            ..self
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
