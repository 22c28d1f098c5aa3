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

//! Contracts of the external device integrations. The session only ever
//! talks to these traits; each verb has a default that reports the
//! capability as not configured, mirroring how a player without a feature
//! answers.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{provider} did not answer within {timeout:?}")]
    TimedOut {
        provider: &'static str,
        timeout: Duration,
    },

    #[error("{0}")]
    Failed(String),
}

/// Common part of every capability provider.
pub trait CapabilityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the integration has what it needs (address, credentials) to act.
    fn configured(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKey {
    Home,
    Up,
    Down,
    Left,
    Right,
    Ok,
}

/// Families of cast-to-display deep links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeepLinkFamily {
    Disney,
    Netflix,
    YouTube,
}

impl DeepLinkFamily {
    /// Delayed key presses sent to the display once the deep link opened.
    pub fn key_sequence(self) -> &'static [(Duration, RemoteKey)] {
        const DISNEY: &[(Duration, RemoteKey)] = &[(Duration::from_secs(4), RemoteKey::Ok)];
        const NETFLIX: &[(Duration, RemoteKey)] = &[
            (Duration::from_secs(6), RemoteKey::Ok),
            (Duration::from_secs(1), RemoteKey::Ok),
        ];
        const YOUTUBE: &[(Duration, RemoteKey)] = &[(Duration::from_secs(4), RemoteKey::Ok)];
        match self {
            DeepLinkFamily::Disney => DISNEY,
            DeepLinkFamily::Netflix => NETFLIX,
            DeepLinkFamily::YouTube => YOUTUBE,
        }
    }
}

impl fmt::Display for DeepLinkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepLinkFamily::Disney => write!(f, "disney"),
            DeepLinkFamily::Netflix => write!(f, "netflix"),
            DeepLinkFamily::YouTube => write!(f, "youtube"),
        }
    }
}

/// Menu path on the console dashboard that lands on the game library,
/// each key preceded by its delay.
pub const CONSOLE_NAVIGATION: &[(Duration, RemoteKey)] = &[
    (Duration::from_millis(1500), RemoteKey::Home),
    (Duration::from_millis(500), RemoteKey::Left),
    (Duration::from_millis(500), RemoteKey::Down),
    (Duration::from_millis(500), RemoteKey::Right),
    (Duration::from_millis(300), RemoteKey::Down),
    (Duration::from_millis(300), RemoteKey::Down),
    (Duration::from_millis(300), RemoteKey::Down),
    (Duration::ZERO, RemoteKey::Ok),
];

/// Media box that opens deep links on the display.
#[async_trait]
pub trait CastTarget: CapabilityProvider {
    /// Opens `content_id` in the family's app. Returns the media duration when
    /// the box reports one.
    async fn launch(&self, _family: DeepLinkFamily, _content_id: &str) -> Result<Option<Duration>, ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

/// Anything able to put the display on the cast device's HDMI input.
#[async_trait]
pub trait HdmiSwitch: CapabilityProvider {
    async fn switch_to_cast_input(&self) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

#[async_trait]
pub trait RemoteControl: CapabilityProvider {
    async fn send_key(&self, _key: RemoteKey) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

#[async_trait]
pub trait SpeakerStreamer: CapabilityProvider {
    /// Streams a local audio file to `target`, or to the default speaker.
    async fn stream_file(&self, _file: &Path, _target: Option<&str>) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

#[async_trait]
pub trait ConsoleControl: CapabilityProvider {
    async fn power_on(&self) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
    async fn launch_app(&self, _app: &str) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

#[async_trait]
pub trait StreamingService: CapabilityProvider {
    /// Starts `uri` at `position_ms` and returns the track duration.
    async fn play(&self, _uri: &str, _position_ms: u64) -> Result<Duration, ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
    /// Resumes the paused stream and returns the time left.
    async fn resume(&self) -> Result<Duration, ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
    async fn pause(&self) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

#[async_trait]
pub trait Notifier: CapabilityProvider {
    async fn notify(&self, _text: &str) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(self.name()))
    }
}

/// Stand-in for an integration that is not set up on this host.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

impl CapabilityProvider for Unconfigured {
    fn name(&self) -> &'static str {
        self.0
    }

    fn configured(&self) -> bool {
        false
    }
}

impl CastTarget for Unconfigured {}
impl HdmiSwitch for Unconfigured {}
impl RemoteControl for Unconfigured {}
impl SpeakerStreamer for Unconfigured {}
impl ConsoleControl for Unconfigured {}
impl StreamingService for Unconfigured {}
impl Notifier for Unconfigured {}

/// Every integration the dispatcher can call.
#[derive(Clone)]
pub struct Providers {
    pub cast: Arc<dyn CastTarget>,
    /// Tried in order when switching to the cast input.
    pub hdmi: Vec<Arc<dyn HdmiSwitch>>,
    pub remote: Arc<dyn RemoteControl>,
    pub speaker: Arc<dyn SpeakerStreamer>,
    pub console: Arc<dyn ConsoleControl>,
    pub streaming: Arc<dyn StreamingService>,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            cast: Arc::new(Unconfigured("cast")),
            hdmi: Vec::new(),
            remote: Arc::new(Unconfigured("remote")),
            speaker: Arc::new(Unconfigured("speaker")),
            console: Arc::new(Unconfigured("console")),
            streaming: Arc::new(Unconfigured("streaming")),
            notifier: Arc::new(Unconfigured("notifier")),
        }
    }
}

/// Bounds a provider call. Running out of time is reported as a provider error.
pub async fn call_with_timeout<T, F>(provider: &'static str, timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output=Result<T, ProviderError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ProviderError::TimedOut { provider, timeout })?
}
