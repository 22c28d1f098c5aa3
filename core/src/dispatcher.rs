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

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use crate::definitions::{
    PadIndex, PlaybackState, Rgb, BLUE, GREEN, LIGHT_BLUE, OLIVE, ORANGE, PINK, PURPLE, RED,
};
use crate::lightshow::Lightshow;
use crate::operator_command::run_operator_command;
use crate::player::{Player, PlayerInterface};
use crate::providers::{call_with_timeout, DeepLinkFamily, ProviderError, Providers, RemoteKey, CONSOLE_NAVIGATION};
use crate::session_state::SharedSessionState;
use crate::tag_config::{Binding, ConsoleAction, PlaylistAction, SpeakerAction, StreamingAction, TagConfig};
use crate::usb::portal::Portal;

/// Lightshow length when the player cannot tell how long the music lasts.
pub const DEFAULT_LIGHTSHOW_DURATION: Duration = Duration::from_secs(60);

/// Less than this left in a paused track restarts it instead of resuming.
const MIN_RESUME_REMAINING: Duration = Duration::from_millis(100);

const CONSOLE_APP_DELAY: Duration = Duration::from_secs(3);

const ERROR_FLASH_LENGTH: u8 = 10;
const ERROR_FLASH_COUNT: u8 = 6;
const EMPTY_PLAYLIST_FLASH_COUNT: u8 = 3;

/// Inputs of one dispatch.
pub struct DispatchContext<'a> {
    /// Pad the tag was placed on; it receives the outcome colours.
    pub pad: PadIndex,
    pub config: &'a TagConfig,
    /// `previous_tag == current_tag` once the placement was recorded: the tag
    /// was put back, or it is the first tag of the session.
    pub reinserted: bool,
}

/// Turns binding fields into player and provider calls and paints the
/// outcome on the portal. No failure leaves this type: everything ends as a
/// log line and a pad colour.
pub struct ActionDispatcher {
    portal: Portal,
    player: Player,
    providers: Providers,
    state: SharedSessionState,
    lightshow: Lightshow,
}

impl ActionDispatcher {
    pub fn new(portal: Portal, player: Player, providers: Providers, state: SharedSessionState) -> Self {
        let lightshow = Lightshow::new(portal.clone());
        Self { portal, player, providers, state, lightshow }
    }

    pub fn lightshow(&self) -> &Lightshow {
        &self.lightshow
    }

    pub async fn stop_lightshow(&mut self, config: &TagConfig) {
        self.lightshow.stop(config.timeouts.lightshow_join).await;
    }

    async fn start_lightshow(&mut self, duration: Duration, config: &TagConfig) {
        if config.lights {
            self.lightshow.start(duration, config.timeouts.lightshow_join).await;
        }
    }

    async fn report_success(&self, pad: PadIndex, colour: Rgb) {
        self.portal.switch_pad(pad, colour).await;
    }

    async fn report_error(&self, pad: PadIndex) {
        self.portal.flash_pad(pad, ERROR_FLASH_LENGTH, ERROR_FLASH_LENGTH, ERROR_FLASH_COUNT, RED).await;
    }

    async fn report<E: Display>(&self, pad: PadIndex, colour: Rgb, action: &str, result: Result<(), E>) -> bool {
        match result {
            Ok(()) => {
                info!("{} done", action);
                self.report_success(pad, colour).await;
                true
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                self.report_error(pad).await;
                false
            }
        }
    }

    /// Runs every action of `binding`, in a fixed order.
    pub async fn dispatch(&mut self, binding: &Binding, ctx: &DispatchContext<'_>) {
        if binding.has_local_playback() && !(ctx.reinserted && self.try_resume_local(ctx).await) {
            if let Some(mp3) = &binding.mp3 {
                let file = ctx.config.mp3_dir.join(mp3);
                self.play_local(vec![file], ctx).await;
            }
            if let Some(playlist) = &binding.playlist {
                self.play_playlist(playlist, ctx).await;
            }
        }
        if let Some(text) = &binding.slack {
            self.notify(text, ctx).await;
        }
        if let Some(command) = &binding.command {
            let result = run_operator_command(command, ctx.config.timeouts.command).await;
            self.report(ctx.pad, ORANGE, &format!("Command `{}`", command), result).await;
        }
        if let Some(stream) = &binding.spotify {
            self.stream(stream, ctx).await;
        }
        let deep_links = [
            (DeepLinkFamily::Disney, &binding.disney),
            (DeepLinkFamily::Netflix, &binding.netflix),
            (DeepLinkFamily::YouTube, &binding.youtube),
        ];
        for (family, content_id) in deep_links {
            if let Some(content_id) = content_id {
                self.deep_link(family, content_id, ctx).await;
            }
        }
        if let Some(speaker) = &binding.airplay {
            self.stream_to_speaker(speaker, ctx).await;
        }
        if let Some(console) = &binding.xbox {
            self.start_console(console, ctx).await;
        }
    }

    /// Pauses local playback and, when configured, the streaming service.
    pub async fn pause_session(&mut self, config: &TagConfig) {
        self.stop_lightshow(config).await;
        if self.state.playback_state() == PlaybackState::Playing {
            match self.player.pause().await {
                Ok(()) => self.state.set_playback_state(PlaybackState::Paused),
                Err(e) => warn!("Failed to pause local playback: {}", e),
            }
        }
        self.pause_streaming(config).await;
    }

    async fn try_resume_local(&mut self, ctx: &DispatchContext<'_>) -> bool {
        let session = self.state.snapshot();
        if session.playback_state != PlaybackState::Paused {
            return false;
        }
        let remaining = session.remaining();
        if remaining.is_some_and(|left| left < MIN_RESUME_REMAINING) {
            debug!("Paused track is practically over, starting again");
            return false;
        }
        if let Err(e) = self.player.resume().await {
            warn!("Failed to resume local playback, starting again: {}", e);
            return false;
        }
        self.state.set_playback_state(PlaybackState::Playing);
        info!("Local playback resumed, {:?} left", remaining);
        self.report_success(ctx.pad, BLUE).await;
        self.start_lightshow(remaining.unwrap_or(DEFAULT_LIGHTSHOW_DURATION), ctx.config).await;
        true
    }

    async fn play_local(&mut self, files: Vec<PathBuf>, ctx: &DispatchContext<'_>) {
        self.pause_streaming(ctx.config).await;
        let count = files.len();
        match self.player.play_files(files).await {
            Ok(duration) => {
                info!("Playing {} local file(s), duration {:?}", count, duration);
                self.state.start_track(duration);
                self.report_success(ctx.pad, BLUE).await;
                self.start_lightshow(duration.unwrap_or(DEFAULT_LIGHTSHOW_DURATION), ctx.config).await;
            }
            Err(e) => {
                warn!("Local playback failed: {}", e);
                self.report_error(ctx.pad).await;
            }
        }
    }

    async fn play_playlist(&mut self, playlist: &PlaylistAction, ctx: &DispatchContext<'_>) {
        let folder = ctx.config.mp3_dir.join(&playlist.folder);
        let mut files = list_mp3_files(&folder).await.unwrap_or_else(|e| {
            warn!("Cannot read playlist folder {}: {}", folder.display(), e);
            Vec::new()
        });
        if files.is_empty() {
            warn!("Playlist {} has no mp3 files", folder.display());
            self.portal.flash_pad(0, ERROR_FLASH_LENGTH, ERROR_FLASH_LENGTH, EMPTY_PLAYLIST_FLASH_COUNT, ORANGE).await;
            return;
        }
        if playlist.shuffle {
            files.shuffle(&mut rand::rng());
        }
        self.play_local(files, ctx).await;
    }

    async fn stop_local(&self) {
        if self.state.playback_state() == PlaybackState::Stopped {
            return;
        }
        if let Err(e) = self.player.stop().await {
            warn!("Failed to stop local playback: {}", e);
        }
        self.state.stop_track();
    }

    async fn pause_streaming(&self, config: &TagConfig) {
        let streaming = &self.providers.streaming;
        if !streaming.configured() {
            return;
        }
        if let Err(e) = call_with_timeout(streaming.name(), config.timeouts.provider, streaming.pause()).await {
            debug!("Streaming pause: {}", e);
        }
    }

    async fn notify(&self, text: &str, ctx: &DispatchContext<'_>) {
        let notifier = &self.providers.notifier;
        let result = if notifier.configured() {
            call_with_timeout(notifier.name(), ctx.config.timeouts.provider, notifier.notify(text)).await
        } else {
            Err(ProviderError::NotConfigured(notifier.name()))
        };
        self.report(ctx.pad, PINK, "Notification", result).await;
    }

    async fn stream(&mut self, action: &StreamingAction, ctx: &DispatchContext<'_>) {
        let streaming = self.providers.streaming.clone();
        if !streaming.configured() {
            info!("Streaming service not configured, {} does not take over the session", action.uri);
            self.state.update(|session| session.current_tag = session.previous_tag.clone());
            return;
        }
        self.stop_local().await;
        let timeout = ctx.config.timeouts.provider;
        let result = if ctx.reinserted {
            call_with_timeout(streaming.name(), timeout, streaming.resume()).await
        } else {
            call_with_timeout(streaming.name(), timeout, streaming.play(&action.uri, action.position_ms)).await
        };
        match result {
            Ok(duration) if !duration.is_zero() => {
                info!("Streaming {} for {:?}", action.uri, duration);
                self.report_success(ctx.pad, GREEN).await;
                self.start_lightshow(duration, ctx.config).await;
            }
            Ok(_) => {
                warn!("Streaming service reported no duration for {}", action.uri);
                self.report_error(ctx.pad).await;
            }
            Err(e) => {
                warn!("Streaming {} failed: {}", action.uri, e);
                self.report_error(ctx.pad).await;
            }
        }
    }

    async fn switch_hdmi_input(&self, timeout: Duration) {
        for switch in self.providers.hdmi.iter().filter(|switch| switch.configured()) {
            match call_with_timeout(switch.name(), timeout, switch.switch_to_cast_input()).await {
                Ok(()) => {
                    debug!("HDMI input switched by {}", switch.name());
                    return;
                }
                Err(e) => warn!("HDMI switch via {} failed: {}", switch.name(), e),
            }
        }
        debug!("HDMI input left unchanged");
    }

    async fn press_keys(&self, sequence: &[(Duration, RemoteKey)], timeout: Duration) {
        let remote = &self.providers.remote;
        if !remote.configured() {
            return;
        }
        for (delay, key) in sequence {
            tokio::time::sleep(*delay).await;
            if let Err(e) = call_with_timeout(remote.name(), timeout, remote.send_key(*key)).await {
                warn!("Remote key {:?} failed: {}", key, e);
            }
        }
    }

    async fn deep_link(&mut self, family: DeepLinkFamily, content_id: &str, ctx: &DispatchContext<'_>) {
        let cast = self.providers.cast.clone();
        if !cast.configured() {
            debug!("{} link skipped, cast target not configured", family);
            return;
        }
        let timeout = ctx.config.timeouts.provider;
        self.stop_local().await;
        self.switch_hdmi_input(timeout).await;
        match call_with_timeout(cast.name(), timeout, cast.launch(family, content_id)).await {
            Ok(duration) => {
                info!("Opened {} {}", family, content_id);
                self.report_success(ctx.pad, PURPLE).await;
                if let Some(duration) = duration {
                    self.start_lightshow(duration, ctx.config).await;
                }
                self.press_keys(family.key_sequence(), timeout).await;
            }
            Err(e) => {
                warn!("Opening {} {} failed: {}", family, content_id, e);
                self.report_error(ctx.pad).await;
            }
        }
    }

    async fn stream_to_speaker(&self, action: &SpeakerAction, ctx: &DispatchContext<'_>) {
        let speaker = &self.providers.speaker;
        let result = if speaker.configured() {
            self.stop_local().await;
            let file = Path::new(&action.file);
            call_with_timeout(speaker.name(), ctx.config.timeouts.provider, speaker.stream_file(file, action.target.as_deref())).await
        } else {
            Err(ProviderError::NotConfigured(speaker.name()))
        };
        self.report(ctx.pad, LIGHT_BLUE, &format!("Speaker stream of {}", action.file), result).await;
    }

    async fn start_console(&self, action: &ConsoleAction, ctx: &DispatchContext<'_>) {
        let console = &self.providers.console;
        let timeout = ctx.config.timeouts.provider;
        let result = if console.configured() {
            self.stop_local().await;
            self.press_keys(CONSOLE_NAVIGATION, timeout).await;
            call_with_timeout(console.name(), timeout, console.power_on()).await
        } else {
            Err(ProviderError::NotConfigured(console.name()))
        };
        if !self.report(ctx.pad, OLIVE, "Console power on", result).await {
            return;
        }
        if let Some(app) = &action.app {
            tokio::time::sleep(CONSOLE_APP_DELAY).await;
            if let Err(e) = call_with_timeout(console.name(), timeout, console.launch_app(app)).await {
                warn!("Launching {} on the console failed: {}", app, e);
            }
        }
    }
}

async fn list_mp3_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("mp3")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::definitions::OFF;
    use crate::test_support::{frame_of, MockPlayer, MockTransport, PlayerCall, ProviderMocks};
    use crate::usb::frame::Frame;
    use crate::usb::requests::PortalCommand;

    const PAD: PadIndex = 1;

    struct Harness {
        transport: Arc<MockTransport>,
        player: Arc<MockPlayer>,
        mocks: ProviderMocks,
        state: SharedSessionState,
        dispatcher: ActionDispatcher,
    }

    fn harness() -> Harness {
        let transport = MockTransport::new();
        let player = MockPlayer::new();
        let mocks = ProviderMocks::new();
        let state = SharedSessionState::new();
        let dispatcher = ActionDispatcher::new(
            Portal::with_transport(transport.clone()),
            Player::new(player.clone()),
            mocks.providers(),
            state.clone(),
        );
        Harness { transport, player, mocks, state, dispatcher }
    }

    fn config() -> TagConfig {
        TagConfig { mp3_dir: PathBuf::from("/music"), ..TagConfig::default() }
    }

    fn ctx(config: &TagConfig) -> DispatchContext<'_> {
        DispatchContext { pad: PAD, config, reinserted: false }
    }

    fn success(colour: Rgb) -> Frame {
        frame_of(PortalCommand::SwitchPad { pad: PAD, colour })
    }

    fn error_pattern() -> Frame {
        frame_of(PortalCommand::FlashPad { pad: PAD, on_length: 10, off_length: 10, pulse_count: 6, colour: RED })
    }

    fn temp_folder(name: &str) -> PathBuf {
        let folder = std::env::temp_dir().join(format!("musicfig_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&folder);
        std::fs::create_dir_all(&folder).unwrap();
        folder
    }

    #[tokio::test(start_paused = true)]
    async fn mp3_plays_from_music_folder() {
        let mut h = harness();
        h.player.set_duration(Some(Duration::from_secs(95)));
        let config = config();
        let binding = Binding { mp3: Some("song.mp3".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(h.player.calls(), vec![PlayerCall::Play(vec![PathBuf::from("/music/song.mp3")])]);
        assert_eq!(h.mocks.streaming.calls(), vec!["pause"]);
        assert!(h.transport.frames().contains(&success(BLUE)));
        let session = h.state.snapshot();
        assert_eq!(session.playback_state, PlaybackState::Playing);
        assert_eq!(session.track_duration, Some(Duration::from_secs(95)));
        assert_eq!(h.dispatcher.lightshow().active_duration(), Some(Duration::from_secs(95)));
        h.dispatcher.stop_lightshow(&config).await;
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_duration_runs_default_lightshow() {
        let mut h = harness();
        let config = config();
        let binding = Binding { mp3: Some("song.mp3".to_string()), ..Binding::default() };
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.dispatcher.lightshow().active_duration(), Some(DEFAULT_LIGHTSHOW_DURATION));
        h.dispatcher.stop_lightshow(&config).await;
    }

    #[tokio::test(start_paused = true)]
    async fn lights_off_never_starts_lightshow() {
        let mut h = harness();
        let config = TagConfig { lights: false, ..config() };
        let binding = Binding { mp3: Some("song.mp3".to_string()), ..Binding::default() };
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.dispatcher.lightshow().active_duration(), None);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.transport.frames(), vec![success(BLUE)]);
    }

    #[tokio::test(start_paused = true)]
    async fn player_failure_flashes_error() {
        let mut h = harness();
        h.player.fail(true);
        let config = config();
        let binding = Binding { mp3: Some("song.mp3".to_string()), ..Binding::default() };
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.transport.frames(), vec![error_pattern()]);
        assert_eq!(h.state.playback_state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn playlist_plays_sorted_mp3_files() {
        let root = temp_folder("playlist");
        let folder = root.join("bedtime");
        std::fs::create_dir_all(&folder).unwrap();
        for name in ["b.mp3", "a.MP3", "notes.txt"] {
            std::fs::write(folder.join(name), b"").unwrap();
        }
        let mut h = harness();
        let config = TagConfig { mp3_dir: root.clone(), lights: false, ..TagConfig::default() };
        let binding = Binding {
            playlist: Some(PlaylistAction { folder: "bedtime".to_string(), shuffle: false }),
            ..Binding::default()
        };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(h.player.calls(), vec![PlayerCall::Play(vec![folder.join("a.MP3"), folder.join("b.mp3")])]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn empty_playlist_flashes_orange_on_first_pad() {
        let root = temp_folder("empty_playlist");
        std::fs::create_dir_all(root.join("empty")).unwrap();
        let mut h = harness();
        let config = TagConfig { mp3_dir: root.clone(), ..TagConfig::default() };
        let binding = Binding {
            playlist: Some(PlaylistAction { folder: "empty".to_string(), shuffle: true }),
            ..Binding::default()
        };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert!(h.player.calls().is_empty());
        assert_eq!(
            h.transport.frames(),
            vec![frame_of(PortalCommand::FlashPad { pad: 0, on_length: 10, off_length: 10, pulse_count: 3, colour: ORANGE })]
        );
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn paused_track_resumes_for_remaining_time() {
        let mut h = harness();
        let config = config();
        h.state.start_track(Some(Duration::from_secs(200)));
        h.state.update(|s| {
            s.playback_state = PlaybackState::Paused;
            s.track_elapsed = Duration::from_secs(50);
        });
        let binding = Binding { mp3: Some("song.mp3".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &DispatchContext { pad: PAD, config: &config, reinserted: true }).await;

        assert_eq!(h.player.calls(), vec![PlayerCall::Resume]);
        assert_eq!(h.state.playback_state(), PlaybackState::Playing);
        assert_eq!(h.dispatcher.lightshow().active_duration(), Some(Duration::from_secs(150)));
        h.dispatcher.stop_lightshow(&config).await;
    }

    #[tokio::test(start_paused = true)]
    async fn finished_track_restarts_instead_of_resuming() {
        let mut h = harness();
        let config = TagConfig { lights: false, ..config() };
        h.state.start_track(Some(Duration::from_secs(10)));
        h.state.update(|s| {
            s.playback_state = PlaybackState::Paused;
            s.track_elapsed = Duration::from_millis(9950);
        });
        let binding = Binding { mp3: Some("song.mp3".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &DispatchContext { pad: PAD, config: &config, reinserted: true }).await;

        assert_eq!(h.player.calls(), vec![PlayerCall::Play(vec![PathBuf::from("/music/song.mp3")])]);
    }

    #[tokio::test(start_paused = true)]
    async fn notification_requires_configured_notifier() {
        let mut h = harness();
        let config = config();
        let binding = Binding { slack: Some("Story time".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.mocks.notifier.calls(), vec!["notify Story time"]);
        assert_eq!(h.transport.frames(), vec![success(PINK)]);

        h.transport.clear();
        h.mocks.notifier.set_configured(false);
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.mocks.notifier.calls().len(), 1);
        assert_eq!(h.transport.frames(), vec![error_pattern()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_outcome_is_painted() {
        let mut h = harness();
        let config = config();
        let ok = Binding { command: Some("true".to_string()), ..Binding::default() };
        h.dispatcher.dispatch(&ok, &ctx(&config)).await;
        assert_eq!(h.transport.frames(), vec![success(ORANGE)]);

        h.transport.clear();
        let broken = Binding { command: Some("exit 1".to_string()), ..Binding::default() };
        h.dispatcher.dispatch(&broken, &ctx(&config)).await;
        assert_eq!(h.transport.frames(), vec![error_pattern()]);
    }

    #[tokio::test(start_paused = true)]
    async fn netflix_link_switches_input_and_confirms() {
        let mut h = harness();
        h.mocks.sync_box.set_configured(false);
        h.mocks.cast.set_duration(Some(Duration::from_secs(1800)));
        h.state.start_track(None);
        let config = config();
        let binding = Binding { netflix: Some("80057281".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(h.player.calls(), vec![PlayerCall::Stop]);
        assert_eq!(h.state.playback_state(), PlaybackState::Stopped);
        assert!(h.mocks.sync_box.calls().is_empty());
        assert_eq!(h.mocks.tv.calls(), vec!["switch_input"]);
        assert_eq!(h.mocks.cast.calls(), vec!["launch netflix 80057281"]);
        assert_eq!(h.mocks.remote.calls(), vec!["key Ok", "key Ok"]);
        assert!(h.transport.frames().contains(&success(PURPLE)));
        assert_eq!(h.dispatcher.lightshow().active_duration(), Some(Duration::from_secs(1800)));
        h.dispatcher.stop_lightshow(&config).await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_working_hdmi_switch_wins() {
        let mut h = harness();
        let config = config();
        let binding = Binding { youtube: Some("dQw4w9WgXcQ".to_string()), ..Binding::default() };
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.mocks.sync_box.calls(), vec!["switch_input"]);
        assert!(h.mocks.tv.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cast_flashes_error_without_keys() {
        let mut h = harness();
        h.mocks.cast.fail(true);
        let config = config();
        let binding = Binding { disney: Some("frozen".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(h.transport.frames(), vec![error_pattern()]);
        assert!(h.mocks.remote.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_cast_skips_deep_links_silently() {
        let mut h = harness();
        h.mocks.cast.set_configured(false);
        let config = config();
        let binding = Binding { disney: Some("frozen".to_string()), youtube: Some("x".to_string()), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert!(h.transport.frames().is_empty());
        assert_eq!(h.mocks.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_plays_from_position() {
        let mut h = harness();
        let config = TagConfig { lights: false, ..config() };
        let binding = Binding {
            spotify: Some(StreamingAction { uri: "spotify:album:abc".to_string(), position_ms: 1500 }),
            ..Binding::default()
        };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.mocks.streaming.calls(), vec!["play spotify:album:abc 1500"]);
        assert_eq!(h.transport.frames(), vec![success(GREEN)]);

        h.dispatcher.dispatch(&binding, &DispatchContext { pad: PAD, config: &config, reinserted: true }).await;
        assert_eq!(h.mocks.streaming.calls(), vec!["play spotify:album:abc 1500", "resume"]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_streaming_duration_is_a_failure() {
        let mut h = harness();
        h.mocks.streaming.set_duration(None);
        let config = config();
        let binding = Binding {
            spotify: Some(StreamingAction { uri: "spotify:track:x".to_string(), position_ms: 0 }),
            ..Binding::default()
        };
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.transport.frames(), vec![error_pattern()]);
        assert_eq!(h.dispatcher.lightshow().active_duration(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_streaming_gives_session_back() {
        let mut h = harness();
        h.mocks.streaming.set_configured(false);
        h.state.update(|s| {
            s.previous_tag = Some("older".to_string());
            s.current_tag = Some("stream".to_string());
        });
        let config = config();
        let binding = Binding {
            spotify: Some(StreamingAction { uri: "spotify:track:x".to_string(), position_ms: 0 }),
            ..Binding::default()
        };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(h.state.snapshot().current_tag.as_deref(), Some("older"));
        assert!(h.transport.frames().is_empty());
        assert!(h.mocks.streaming.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn speaker_streams_to_named_target() {
        let mut h = harness();
        let config = config();
        let binding = Binding {
            airplay: Some(SpeakerAction { file: "/srv/rain.mp3".to_string(), target: Some("Kitchen".to_string()) }),
            ..Binding::default()
        };
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.mocks.speaker.calls(), vec!["stream /srv/rain.mp3 Kitchen"]);
        assert_eq!(h.transport.frames(), vec![success(LIGHT_BLUE)]);

        h.transport.clear();
        h.mocks.speaker.set_configured(false);
        h.dispatcher.dispatch(&binding, &ctx(&config)).await;
        assert_eq!(h.transport.frames(), vec![error_pattern()]);
    }

    #[tokio::test(start_paused = true)]
    async fn console_navigates_powers_on_and_launches_app() {
        let mut h = harness();
        let config = config();
        let binding = Binding {
            xbox: Some(ConsoleAction { app: Some("Minecraft".to_string()) }),
            ..Binding::default()
        };
        let started = tokio::time::Instant::now();

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(
            h.mocks.remote.calls(),
            vec!["key Home", "key Left", "key Down", "key Right", "key Down", "key Down", "key Down", "key Ok"]
        );
        assert_eq!(h.mocks.console.calls(), vec!["power_on", "launch_app Minecraft"]);
        assert_eq!(h.transport.frames(), vec![success(OLIVE)]);
        assert!(started.elapsed() >= Duration::from_millis(3900) + CONSOLE_APP_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn console_power_failure_skips_app() {
        let mut h = harness();
        h.mocks.console.fail(true);
        h.mocks.remote.set_configured(false);
        let config = config();
        let binding = Binding { xbox: Some(ConsoleAction { app: Some("Halo".to_string()) }), ..Binding::default() };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(h.mocks.console.calls(), vec!["power_on"]);
        assert_eq!(h.transport.frames(), vec![error_pattern()]);
    }

    #[tokio::test(start_paused = true)]
    async fn every_present_field_fires_in_order() {
        let mut h = harness();
        let config = TagConfig { lights: false, ..config() };
        let binding = Binding {
            mp3: Some("song.mp3".to_string()),
            slack: Some("hello".to_string()),
            youtube: Some("abc".to_string()),
            ..Binding::default()
        };

        h.dispatcher.dispatch(&binding, &ctx(&config)).await;

        assert_eq!(
            h.transport.frames(),
            vec![success(BLUE), success(PINK), success(PURPLE)]
        );
        assert_eq!(h.player.calls()[1], PlayerCall::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_session_pauses_player_and_stream() {
        let mut h = harness();
        let config = config();
        h.state.start_track(Some(Duration::from_secs(60)));
        h.dispatcher.start_lightshow(Duration::from_secs(60), &config).await;

        h.dispatcher.pause_session(&config).await;

        assert_eq!(h.player.calls(), vec![PlayerCall::Pause]);
        assert_eq!(h.state.playback_state(), PlaybackState::Paused);
        assert_eq!(h.mocks.streaming.calls(), vec!["pause"]);
        assert_eq!(h.dispatcher.lightshow().active_duration(), None);
        assert_eq!(h.transport.frames().last(), Some(&frame_of(PortalCommand::SwitchPad { pad: 0, colour: OFF })));
    }
}
