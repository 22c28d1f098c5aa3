use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;
use crate::definitions::PlaybackState;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum PlayerError {
    #[error("Feature not supported")]
    FeatureNotSupported,
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Unknown error: {0}")]
    UnknownError(String),
}

/// One status notification from the local player.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub elapsed: Duration,
}

pub type PlayerStatusStream = futures::channel::mpsc::Receiver<PlayerStatus>;

#[async_trait]
pub trait PlayerInterface: Send + Sync {
    async fn get_current_status(&self) -> Result<PlayerStatus, PlayerError>
    {
        Err(PlayerError::FeatureNotSupported)
    }

    /// Replaces the queue with `files` and starts playing. Returns the summed
    /// duration when the decoder knows it.
    async fn play_files(&self, _files: Vec<PathBuf>) -> Result<Option<Duration>, PlayerError>
    {
        Err(PlayerError::FeatureNotSupported)
    }
    async fn resume(&self) -> Result<(), PlayerError>
    {
        Err(PlayerError::FeatureNotSupported)
    }
    async fn pause(&self) -> Result<(), PlayerError>
    {
        Err(PlayerError::FeatureNotSupported)
    }
    async fn stop(&self) -> Result<(), PlayerError>
    {
        Err(PlayerError::FeatureNotSupported)
    }

    async fn listen_to_player_notifications(&self) -> Result<PlayerStatusStream, PlayerError> {
        Err(PlayerError::FeatureNotSupported)
    }
}

/// Player used when no audio output exists. Every verb reports
/// [`PlayerError::FeatureNotSupported`].
pub struct NoopPlayer;

impl PlayerInterface for NoopPlayer {}

#[derive(Clone)]
pub struct Player {
    player_impl: Arc<dyn PlayerInterface + Sync + Send>,
}

impl Player {
    pub fn new(player_impl: Arc<dyn PlayerInterface + Sync + Send>) -> Self {
        Self { player_impl }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopPlayer))
    }
}

#[async_trait]
impl PlayerInterface for Player {
    async fn get_current_status(&self) -> Result<PlayerStatus, PlayerError> {
        self.player_impl.get_current_status().await
    }
    async fn play_files(&self, files: Vec<PathBuf>) -> Result<Option<Duration>, PlayerError> {
        self.player_impl.play_files(files).await
    }
    async fn resume(&self) -> Result<(), PlayerError> {
        self.player_impl.resume().await
    }
    async fn pause(&self) -> Result<(), PlayerError> {
        self.player_impl.pause().await
    }
    async fn stop(&self) -> Result<(), PlayerError> {
        self.player_impl.stop().await
    }

    async fn listen_to_player_notifications(&self) -> Result<PlayerStatusStream, PlayerError> {
        self.player_impl.listen_to_player_notifications().await
    }
}
