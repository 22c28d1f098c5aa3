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

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use async_trait::async_trait;
use log::{debug, info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::oneshot;
use musicfig_core::definitions::PlaybackState;
use musicfig_core::player::{PlayerError, PlayerInterface, PlayerStatus, PlayerStatusStream};

const STATUS_INTERVAL: Duration = Duration::from_millis(250);

enum AudioCommand {
    Play {
        files: Vec<PathBuf>,
        reply: oneshot::Sender<Result<Option<Duration>, PlayerError>>,
    },
    Resume,
    Pause,
    Stop,
}

/// Elapsed time of the queue, excluding paused stretches.
#[derive(Debug, Default)]
struct PlaybackClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl PlaybackClock {
    fn start(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(now);
    }

    fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |since| now.saturating_duration_since(since))
    }
}

fn open_source(file: &Path) -> Result<Decoder<BufReader<File>>, PlayerError> {
    let reader = File::open(file).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PlayerError::FileNotFound(file.to_path_buf()),
        _ => PlayerError::UnknownError(format!("{}: {}", file.display(), e)),
    })?;
    Decoder::new(BufReader::new(reader)).map_err(|e| PlayerError::UnknownError(format!("{}: {}", file.display(), e)))
}

/// Queues every decodable file on a fresh sink. The summed duration is only
/// known when every queued file reports its own.
fn start_queue(handle: &OutputStreamHandle, files: &[PathBuf]) -> Result<(Sink, Option<Duration>), PlayerError> {
    let sink = Sink::try_new(handle).map_err(|e| PlayerError::UnknownError(e.to_string()))?;
    let mut total = Some(Duration::ZERO);
    let mut first_error = None;
    let mut queued = 0;
    for file in files {
        match open_source(file) {
            Ok(source) => {
                total = total.zip(source.total_duration()).map(|(sum, length)| sum + length);
                sink.append(source);
                queued += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                first_error.get_or_insert(e);
            }
        }
    }
    match (queued, first_error) {
        (0, Some(e)) => Err(e),
        (0, None) => Err(PlayerError::UnknownError("nothing to play".to_string())),
        _ => Ok((sink, total)),
    }
}

struct AudioThread {
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    clock: PlaybackClock,
    state: PlaybackState,
}

impl AudioThread {
    fn handle_command(&mut self, command: AudioCommand) {
        let now = Instant::now();
        match command {
            AudioCommand::Play { files, reply } => {
                if let Some(previous) = self.sink.take() {
                    previous.stop();
                }
                let result = start_queue(&self.handle, &files).map(|(sink, duration)| {
                    self.sink = Some(sink);
                    self.clock.start(now);
                    self.state = PlaybackState::Playing;
                    duration
                });
                if result.is_err() {
                    self.clock.reset();
                    self.state = PlaybackState::Stopped;
                }
                let _ = reply.send(result);
            }
            AudioCommand::Resume => {
                if let Some(sink) = &self.sink {
                    sink.play();
                    self.clock.resume(now);
                    self.state = PlaybackState::Playing;
                }
            }
            AudioCommand::Pause => {
                if let Some(sink) = &self.sink {
                    sink.pause();
                    self.clock.pause(now);
                    self.state = PlaybackState::Paused;
                }
            }
            AudioCommand::Stop => {
                if let Some(sink) = self.sink.take() {
                    sink.stop();
                }
                self.clock.reset();
                self.state = PlaybackState::Stopped;
            }
        }
    }

    fn check_end_of_queue(&mut self) {
        let finished = self.state == PlaybackState::Playing && self.sink.as_ref().map_or(true, Sink::empty);
        if finished {
            debug!("Local queue finished");
            self.sink = None;
            self.clock.reset();
            self.state = PlaybackState::Stopped;
        }
    }

    fn status(&self) -> PlayerStatus {
        PlayerStatus { state: self.state, elapsed: self.clock.elapsed(Instant::now()) }
    }
}

fn run_audio_thread(
    commands: Receiver<AudioCommand>,
    mut notifications: futures::channel::mpsc::Sender<PlayerStatus>,
    shared_status: Arc<Mutex<PlayerStatus>>,
    ready: Sender<Result<(), PlayerError>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(PlayerError::UnknownError(format!("no audio output: {}", e))));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut audio = AudioThread { handle, sink: None, clock: PlaybackClock::default(), state: PlaybackState::Stopped };
    let mut last_state = audio.state;
    loop {
        match commands.recv_timeout(STATUS_INTERVAL) {
            Ok(command) => audio.handle_command(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        audio.check_end_of_queue();

        let status = audio.status();
        *shared_status.lock().unwrap_or_else(PoisonError::into_inner) = status;
        if status.state == PlaybackState::Playing || status.state != last_state {
            last_state = status.state;
            if let Err(e) = notifications.try_send(status) {
                if !e.is_full() {
                    debug!("Player status listener gone");
                }
            }
        }
    }
    info!("Audio thread stopped");
}

/// rodio-backed player. rodio's output stream cannot leave the thread that
/// opened it, so a dedicated audio thread owns it and takes commands over a
/// channel.
pub struct LocalPlayer {
    commands: Mutex<Sender<AudioCommand>>,
    status: Arc<Mutex<PlayerStatus>>,
    notifications: Mutex<Option<PlayerStatusStream>>,
}

impl LocalPlayer {
    pub fn start() -> Result<Self, PlayerError> {
        let (command_tx, command_rx) = std::sync::mpsc::channel();
        let (status_tx, status_rx) = futures::channel::mpsc::channel(30);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let status = Arc::new(Mutex::new(PlayerStatus::default()));
        let thread_status = status.clone();

        std::thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || run_audio_thread(command_rx, status_tx, thread_status, ready_tx))
            .map_err(|e| PlayerError::UnknownError(e.to_string()))?;
        ready_rx
            .recv()
            .map_err(|_| PlayerError::UnknownError("audio thread exited during start".to_string()))??;

        Ok(Self {
            commands: Mutex::new(command_tx),
            status,
            notifications: Mutex::new(Some(status_rx)),
        })
    }

    fn send(&self, command: AudioCommand) -> Result<(), PlayerError> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(command)
            .map_err(|_| PlayerError::UnknownError("audio thread stopped".to_string()))
    }
}

#[async_trait]
impl PlayerInterface for LocalPlayer {
    async fn get_current_status(&self) -> Result<PlayerStatus, PlayerError> {
        Ok(*self.status.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn play_files(&self, files: Vec<PathBuf>) -> Result<Option<Duration>, PlayerError> {
        let (reply, result) = oneshot::channel();
        self.send(AudioCommand::Play { files, reply })?;
        result
            .await
            .map_err(|_| PlayerError::UnknownError("audio thread dropped the request".to_string()))?
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        self.send(AudioCommand::Resume)
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.send(AudioCommand::Pause)
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        self.send(AudioCommand::Stop)
    }

    async fn listen_to_player_notifications(&self) -> Result<PlayerStatusStream, PlayerError> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PlayerError::FeatureNotSupported)
    }
}
