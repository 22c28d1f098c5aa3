//! Recording doubles for the portal transport, the local player and the
//! capability providers.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use futures::channel::mpsc::Sender;
use crate::definitions::PadIndex;
use crate::player::{PlayerError, PlayerInterface, PlayerStatus, PlayerStatusStream};
use crate::providers::{
    CapabilityProvider, CastTarget, ConsoleControl, DeepLinkFamily, HdmiSwitch, Notifier, Providers, ProviderError,
    RemoteControl, RemoteKey, SpeakerStreamer, StreamingService,
};
use crate::usb::errors::PortalError;
use crate::usb::frame::{encode_frame, Frame, TAG_EVENT_MARKER};
use crate::usb::portal::PortalTransport;
use crate::usb::requests::PortalCommand;

pub fn frame_of(command: PortalCommand) -> Frame {
    encode_frame(&command.to_bytes()).unwrap()
}

#[derive(Default)]
pub struct MockTransport {
    frames: Mutex<Vec<Frame>>,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every frame written so far, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn push_inbound(&self, frame: Vec<u8>) {
        self.inbound.lock().unwrap().push_back(frame);
    }

    pub fn tag_frame(pad: PadIndex, removed: bool, uid: [u8; 7]) -> Vec<u8> {
        let mut frame = vec![0u8; 32];
        frame[0] = TAG_EVENT_MARKER;
        frame[1] = 0x0b;
        frame[2] = pad;
        frame[5] = removed as u8;
        frame[6..13].copy_from_slice(&uid);
        frame
    }
}

#[async_trait]
impl PortalTransport for MockTransport {
    async fn write_frame(&self, frame: &Frame) -> Result<(), PortalError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortalError::OtherError("write refused".to_string()));
        }
        self.frames.lock().unwrap().push(*frame);
        Ok(())
    }

    async fn read_frame(&self, timeout: Duration) -> Result<Option<Vec<u8>>, PortalError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortalError::OtherError("read refused".to_string()));
        }
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(frame) => Ok(Some(frame)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Play(Vec<PathBuf>),
    Resume,
    Pause,
    Stop,
}

#[derive(Default)]
pub struct MockPlayer {
    calls: Mutex<Vec<PlayerCall>>,
    duration: Mutex<Option<Duration>>,
    status: Mutex<Option<PlayerStatus>>,
    notifications: Mutex<Option<PlayerStatusStream>>,
    fail: AtomicBool,
}

impl MockPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_notifications() -> (Arc<Self>, Sender<PlayerStatus>) {
        let (tx, rx) = futures::channel::mpsc::channel(30);
        let player = Self::default();
        *player.notifications.lock().unwrap() = Some(rx);
        (Arc::new(player), tx)
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        *self.duration.lock().unwrap() = duration;
    }

    pub fn set_status(&self, status: PlayerStatus) {
        *self.status.lock().unwrap() = Some(status);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: PlayerCall) -> Result<(), PlayerError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            Err(PlayerError::UnknownError("no audio device".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PlayerInterface for MockPlayer {
    async fn get_current_status(&self) -> Result<PlayerStatus, PlayerError> {
        self.status.lock().unwrap().ok_or(PlayerError::FeatureNotSupported)
    }

    async fn play_files(&self, files: Vec<PathBuf>) -> Result<Option<Duration>, PlayerError> {
        self.record(PlayerCall::Play(files))?;
        Ok(*self.duration.lock().unwrap())
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        self.record(PlayerCall::Resume)
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.record(PlayerCall::Pause)
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        self.record(PlayerCall::Stop)
    }

    async fn listen_to_player_notifications(&self) -> Result<PlayerStatusStream, PlayerError> {
        self.notifications.lock().unwrap().take().ok_or(PlayerError::FeatureNotSupported)
    }
}

/// One fake integration implementing every provider contract. Calls are
/// recorded as short strings such as `"launch netflix 80057281"`.
pub struct MockProvider {
    name: &'static str,
    configured: AtomicBool,
    fail: AtomicBool,
    duration: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            configured: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            duration: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        *self.duration.lock().unwrap() = duration;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            Err(ProviderError::Failed(format!("{} refused", self.name)))
        } else {
            Ok(())
        }
    }

    fn duration(&self) -> Option<Duration> {
        *self.duration.lock().unwrap()
    }
}

impl CapabilityProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CastTarget for MockProvider {
    async fn launch(&self, family: DeepLinkFamily, content_id: &str) -> Result<Option<Duration>, ProviderError> {
        self.record(format!("launch {} {}", family, content_id))?;
        Ok(self.duration())
    }
}

#[async_trait]
impl HdmiSwitch for MockProvider {
    async fn switch_to_cast_input(&self) -> Result<(), ProviderError> {
        self.record("switch_input".to_string())
    }
}

#[async_trait]
impl RemoteControl for MockProvider {
    async fn send_key(&self, key: RemoteKey) -> Result<(), ProviderError> {
        self.record(format!("key {:?}", key))
    }
}

#[async_trait]
impl SpeakerStreamer for MockProvider {
    async fn stream_file(&self, file: &Path, target: Option<&str>) -> Result<(), ProviderError> {
        self.record(format!("stream {} {}", file.display(), target.unwrap_or("default")))
    }
}

#[async_trait]
impl ConsoleControl for MockProvider {
    async fn power_on(&self) -> Result<(), ProviderError> {
        self.record("power_on".to_string())
    }

    async fn launch_app(&self, app: &str) -> Result<(), ProviderError> {
        self.record(format!("launch_app {}", app))
    }
}

#[async_trait]
impl StreamingService for MockProvider {
    async fn play(&self, uri: &str, position_ms: u64) -> Result<Duration, ProviderError> {
        self.record(format!("play {} {}", uri, position_ms))?;
        Ok(self.duration().unwrap_or(Duration::ZERO))
    }

    async fn resume(&self) -> Result<Duration, ProviderError> {
        self.record("resume".to_string())?;
        Ok(self.duration().unwrap_or(Duration::ZERO))
    }

    async fn pause(&self) -> Result<(), ProviderError> {
        self.record("pause".to_string())
    }
}

#[async_trait]
impl Notifier for MockProvider {
    async fn notify(&self, text: &str) -> Result<(), ProviderError> {
        self.record(format!("notify {}", text))
    }
}

/// A full set of configured mock integrations.
pub struct ProviderMocks {
    pub cast: Arc<MockProvider>,
    pub sync_box: Arc<MockProvider>,
    pub tv: Arc<MockProvider>,
    pub remote: Arc<MockProvider>,
    pub speaker: Arc<MockProvider>,
    pub console: Arc<MockProvider>,
    pub streaming: Arc<MockProvider>,
    pub notifier: Arc<MockProvider>,
}

impl ProviderMocks {
    pub fn new() -> Self {
        let streaming = MockProvider::new("streaming");
        streaming.set_duration(Some(Duration::from_secs(180)));
        Self {
            cast: MockProvider::new("cast"),
            sync_box: MockProvider::new("sync_box"),
            tv: MockProvider::new("tv"),
            remote: MockProvider::new("remote"),
            speaker: MockProvider::new("speaker"),
            console: MockProvider::new("console"),
            streaming,
            notifier: MockProvider::new("notifier"),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            cast: self.cast.clone(),
            hdmi: vec![self.sync_box.clone() as Arc<dyn HdmiSwitch>, self.tv.clone()],
            remote: self.remote.clone(),
            speaker: self.speaker.clone(),
            console: self.console.clone(),
            streaming: self.streaming.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn total_calls(&self) -> usize {
        [&self.cast, &self.sync_box, &self.tv, &self.remote, &self.speaker, &self.console, &self.streaming, &self.notifier]
            .iter()
            .map(|mock| mock.calls().len())
            .sum()
    }
}
