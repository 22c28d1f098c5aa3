use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use crate::definitions::PlaybackState;
use crate::player::PlayerStatus;

/// What the session remembers between tag events.
///
/// `current_tag` is only ever replaced by another identifier, never cleared:
/// a lifted tag stays current so placing it back can resume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub current_tag: Option<String>,
    pub previous_tag: Option<String>,
    pub playback_state: PlaybackState,
    pub track_duration: Option<Duration>,
    pub track_elapsed: Duration,
}

impl SessionState {
    /// Time left in the local track, when its duration is known.
    pub fn remaining(&self) -> Option<Duration> {
        self.track_duration.map(|duration| duration.saturating_sub(self.track_elapsed))
    }
}

/// Session state shared between the control loop and the playback monitor.
/// The lock is held only inside the accessors, never across an await.
#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<Mutex<SessionState>>,
}

impl SharedSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.lock().playback_state
    }

    pub fn set_playback_state(&self, playback_state: PlaybackState) {
        self.lock().playback_state = playback_state;
    }

    /// Records a fresh local track. Elapsed time restarts at zero.
    pub fn start_track(&self, duration: Option<Duration>) {
        let mut state = self.lock();
        state.playback_state = PlaybackState::Playing;
        state.track_duration = duration;
        state.track_elapsed = Duration::ZERO;
    }

    pub fn stop_track(&self) {
        let mut state = self.lock();
        state.playback_state = PlaybackState::Stopped;
        state.track_elapsed = Duration::ZERO;
    }

    /// Applies a player notification. Returns whether anything changed.
    pub fn apply_player_status(&self, status: &PlayerStatus) -> bool {
        let mut state = self.lock();
        let changed = state.playback_state != status.state || state.track_elapsed != status.elapsed;
        state.playback_state = status.state;
        state.track_elapsed = status.elapsed;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_duration_minus_elapsed() {
        let state = SharedSessionState::new();
        state.start_track(Some(Duration::from_secs(120)));
        state.apply_player_status(&PlayerStatus {
            state: PlaybackState::Playing,
            elapsed: Duration::from_secs(45),
        });
        assert_eq!(state.snapshot().remaining(), Some(Duration::from_secs(75)));

        state.apply_player_status(&PlayerStatus {
            state: PlaybackState::Playing,
            elapsed: Duration::from_secs(130),
        });
        assert_eq!(state.snapshot().remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn unchanged_status_reports_no_change() {
        let state = SharedSessionState::new();
        let status = PlayerStatus { state: PlaybackState::Paused, elapsed: Duration::from_secs(3) };
        assert!(state.apply_player_status(&status));
        assert!(!state.apply_player_status(&status));
    }

    #[test]
    fn clones_share_one_state() {
        let state = SharedSessionState::new();
        let monitor_view = state.clone();
        monitor_view.set_playback_state(PlaybackState::Paused);
        assert_eq!(state.playback_state(), PlaybackState::Paused);

        state.stop_track();
        assert_eq!(monitor_view.snapshot().playback_state, PlaybackState::Stopped);
        assert_eq!(monitor_view.snapshot().remaining(), None);
    }
}
