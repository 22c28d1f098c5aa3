// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const DEFAULT_MP3_DIR: &str = "music";
const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;
const DEFAULT_LIGHTSHOW_JOIN_TIMEOUT_MS: u64 = 2000;
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid tag configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistAction {
    pub folder: String,
    pub shuffle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingAction {
    pub uri: String,
    pub position_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerAction {
    pub file: String,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleAction {
    pub app: Option<String>,
}

/// Everything a tag is bound to. Fields are independent: every one present fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    pub mp3: Option<String>,
    pub playlist: Option<PlaylistAction>,
    pub slack: Option<String>,
    pub command: Option<String>,
    pub spotify: Option<StreamingAction>,
    pub disney: Option<String>,
    pub netflix: Option<String>,
    pub youtube: Option<String>,
    pub airplay: Option<SpeakerAction>,
    pub xbox: Option<ConsoleAction>,
}

impl Binding {
    pub fn has_local_playback(&self) -> bool {
        self.mp3.is_some() || self.playlist.is_some()
    }
}

// Presence-only keys: `shuffle:` and `xbox:` count even with a null value.
fn key_present<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    serde::de::IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

#[derive(Debug, Default, Deserialize)]
struct RawBinding {
    mp3: Option<String>,
    playlist: Option<String>,
    #[serde(default, deserialize_with = "key_present")]
    shuffle: bool,
    spotify: Option<String>,
    position_ms: Option<serde_yaml::Value>,
    disney: Option<String>,
    netflix: Option<String>,
    youtube: Option<String>,
    airplay: Option<String>,
    homepod: Option<String>,
    #[serde(default, deserialize_with = "key_present")]
    xbox: bool,
    xbox_app: Option<String>,
    command: Option<String>,
    slack: Option<String>,
}

fn parse_position_ms(identifier: &str, value: Option<&serde_yaml::Value>) -> u64 {
    let parsed = match value {
        None => return 0,
        Some(serde_yaml::Value::Number(n)) => n.as_u64(),
        Some(serde_yaml::Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    parsed.unwrap_or_else(|| {
        warn!("Tag {}: invalid position_ms {:?}, starting from 0", identifier, value);
        0
    })
}

impl RawBinding {
    fn validate(self, identifier: &str) -> Binding {
        if self.shuffle && self.playlist.is_none() {
            debug!("Tag {}: shuffle without playlist is ignored", identifier);
        }
        if self.xbox_app.is_some() && !self.xbox {
            debug!("Tag {}: xbox_app without xbox is ignored", identifier);
        }
        let position_ms = parse_position_ms(identifier, self.position_ms.as_ref());
        Binding {
            mp3: self.mp3,
            playlist: self.playlist.map(|folder| PlaylistAction { folder, shuffle: self.shuffle }),
            slack: self.slack,
            command: self.command,
            spotify: self.spotify.map(|uri| StreamingAction { uri, position_ms }),
            disney: self.disney,
            netflix: self.netflix,
            youtube: self.youtube,
            airplay: self.airplay.map(|file| SpeakerAction { file, target: self.homepod }),
            xbox: self.xbox.then_some(ConsoleAction { app: self.xbox_app }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTagConfig {
    lights: Option<bool>,
    mp3_dir: Option<PathBuf>,
    slack_hook: Option<String>,
    poll_timeout_ms: Option<u64>,
    lightshow_join_timeout_ms: Option<u64>,
    provider_timeout_ms: Option<u64>,
    command_timeout_secs: Option<u64>,
    #[serde(default)]
    identifier: HashMap<String, RawBinding>,
}

/// Timing knobs of the control loop and its workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub poll: Duration,
    pub lightshow_join: Duration,
    pub provider: Duration,
    pub command: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            lightshow_join: Duration::from_millis(DEFAULT_LIGHTSHOW_JOIN_TIMEOUT_MS),
            provider: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            command: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagConfig {
    pub lights: bool,
    pub mp3_dir: PathBuf,
    pub slack_hook: Option<String>,
    pub timeouts: Timeouts,
    pub bindings: HashMap<String, Binding>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            lights: true,
            mp3_dir: PathBuf::from(DEFAULT_MP3_DIR),
            slack_hook: None,
            timeouts: Timeouts::default(),
            bindings: HashMap::new(),
        }
    }
}

impl TagConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawTagConfig = serde_yaml::from_str(yaml)?;
        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            poll: raw.poll_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.poll),
            lightshow_join: raw.lightshow_join_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.lightshow_join),
            provider: raw.provider_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.provider),
            command: raw.command_timeout_secs.map(Duration::from_secs).unwrap_or(defaults.command),
        };
        let bindings = raw.identifier
            .into_iter()
            .map(|(identifier, binding)| {
                let binding = binding.validate(&identifier);
                (identifier, binding)
            })
            .collect();

        Ok(Self {
            lights: raw.lights.unwrap_or(true),
            mp3_dir: raw.mp3_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_MP3_DIR)),
            slack_hook: raw.slack_hook,
            timeouts,
            bindings,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn binding(&self, identifier: &str) -> Option<&Binding> {
        self.bindings.get(identifier)
    }
}

/// Tag configuration that follows its file on disk. `refresh` is called for
/// every placed tag so edits apply without a restart.
pub struct TagConfigStore {
    path: Option<PathBuf>,
    current: TagConfig,
}

impl TagConfigStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let current = TagConfig::load(&path)?;
        Ok(Self { path: Some(path), current })
    }

    pub fn fixed(config: TagConfig) -> Self {
        Self { path: None, current: config }
    }

    pub fn current(&self) -> &TagConfig {
        &self.current
    }

    /// Re-reads the file. A broken file keeps the last good configuration.
    pub fn refresh(&mut self) -> &TagConfig {
        if let Some(path) = &self.path {
            match TagConfig::load(path) {
                Ok(config) => self.current = config,
                Err(e) => warn!("Keeping previous tag configuration: {}", e),
            }
        }
        &self.current
    }
}
