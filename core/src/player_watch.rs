use std::time::Duration;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info};
use crate::player::{Player, PlayerError, PlayerInterface, PlayerStatus, PlayerStatusStream};
use crate::service::{spawn_service, ServiceHandle};
use crate::session_state::SharedSessionState;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn create_polling_status_watch(player: Player) -> PlayerStatusStream
{
    let (mut tx, rx) = futures::channel::mpsc::channel(30);
    tokio::spawn(async move {
        let mut current_status: Option<PlayerStatus> = None;
        loop {
            let status = player.get_current_status().await.unwrap_or_default();
            if current_status != Some(status) {
                current_status = Some(status);
                if let Err(e) = tx.send(status).await {
                    if e.is_disconnected() {
                        break;
                    }
                    error!("Failed to send player status to channel: {}", e);
                }
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        }
    });
    rx
}

async fn get_playback_notification_stream(player: Player) -> Result<PlayerStatusStream, PlayerError>
{
    match player.listen_to_player_notifications().await {
        Ok(listener) => Ok(listener),
        Err(PlayerError::FeatureNotSupported) => Ok(create_polling_status_watch(player)),
        Err(e) => Err(e),
    }
}

/// Starts the playback monitor: player status notifications are written into
/// the shared session state until the notification queue closes or the
/// returned handle is shut down.
pub async fn run_player_watch(player: Player, session_state: SharedSessionState)
    -> Result<ServiceHandle, PlayerError>
{
    let mut notifications = get_playback_notification_stream(player).await?;
    Ok(spawn_service(move |mut stop| async move {
        loop {
            tokio::select! {
                _ = stop.signaled() => break,
                status = notifications.next() => match status {
                    Some(status) => {
                        if session_state.apply_player_status(&status) {
                            debug!("Player status {:?} at {:?}", status.state, status.elapsed);
                        }
                    }
                    None => {
                        info!("Player notification queue closed, playback monitor stopped");
                        break;
                    }
                }
            }
        }
    }))
}
