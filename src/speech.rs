use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_SPEECH_COMMAND: &str = "say";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited unsuccessfully ({status})")]
    Exit { command: String, status: String },
}

/// Voices offered by the speech command
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Default,
    Anna,
    Thomas,
    Alice,
}

impl Voice {
    const ALL: [Voice; 4] = [Voice::Default, Voice::Anna, Voice::Thomas, Voice::Alice];

    /// Name passed to the speech command; the default voice passes none
    pub fn command_name(&self) -> Option<&'static str> {
        match self {
            Voice::Default => None,
            Voice::Anna => Some("Anna"),
            Voice::Thomas => Some("Thomas"),
            Voice::Alice => Some("Alice"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Voice::Default => "English (Default)",
            Voice::Anna => "German (Anna)",
            Voice::Thomas => "French (Thomas)",
            Voice::Alice => "Italian (Alice)",
        }
    }

    pub fn next(&self) -> Voice {
        let idx = Self::ALL.iter().position(|v| v == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Speaks a single symbol, blocking until playback ends
pub trait Speaker: Send + Sync {
    fn speak(&self, symbol: &str, voice: Option<&str>) -> Result<(), SpeechError>;
}

/// Runs an external text-to-speech program, e.g. macOS `say`
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: PathBuf,
}

impl CommandSpeaker {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(symbol: &str, voice: Option<&str>) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        args.push(symbol.to_string());
        args
    }
}

impl Default for CommandSpeaker {
    fn default() -> Self {
        Self::new(DEFAULT_SPEECH_COMMAND)
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, symbol: &str, voice: Option<&str>) -> Result<(), SpeechError> {
        let command = self.program().display().to_string();
        debug!(%command, symbol, ?voice, "speaking");

        let status = Command::new(&self.program)
            .args(Self::args(symbol, voice))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| SpeechError::Spawn {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            warn!(%command, %status, "speech command failed");
            Err(SpeechError::Exit {
                command,
                status: status.to_string(),
            })
        }
    }
}

/// Speaks nothing; for `--mute` and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, _symbol: &str, _voice: Option<&str>) -> Result<(), SpeechError> {
        Ok(())
    }
}
